//! # Control de Admisión
//! src/dispatch/admission.rs
//!
//! Techo global opcional de conexiones en vuelo, independiente de la
//! capacidad de la cola. Es una segunda capa de backpressure: actúa antes
//! de que la conexión llegue a encolarse.
//!
//! Cada conexión admitida lleva un `AdmissionPermit`; al soltarlo (cuando el
//! worker termina con la conexión, o cuando se rechaza) se libera el lugar.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Política al alcanzar el techo de conexiones
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdmissionMode {
    /// Aceptar y cerrar inmediatamente la conexión
    Reject,

    /// Bloquear el acceptor antes de `accept()` hasta que se libere un lugar
    Wait,
}

struct GateState {
    in_flight: usize,
    closed: bool,
}

/// Contador de conexiones en vuelo con techo opcional
pub struct AdmissionGate {
    state: Mutex<GateState>,
    released: Condvar,
    limit: Option<usize>,
}

impl AdmissionGate {
    /// Crea una compuerta; `None` significa sin techo
    pub fn new(limit: Option<usize>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(GateState {
                in_flight: 0,
                closed: false,
            }),
            released: Condvar::new(),
            limit,
        })
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn has_room(&self, state: &GateState) -> bool {
        self.limit.map_or(true, |limit| state.in_flight < limit)
    }

    /// Intenta admitir una conexión sin bloquear
    pub fn try_acquire(self: &Arc<Self>) -> Option<AdmissionPermit> {
        let mut state = self.lock();
        if state.closed || !self.has_room(&state) {
            return None;
        }
        state.in_flight += 1;
        Some(AdmissionPermit {
            gate: Arc::clone(self),
        })
    }

    /// Espera hasta que haya lugar y admite una conexión
    ///
    /// Retorna `None` solo si la compuerta se cerró mientras esperaba.
    pub fn acquire(self: &Arc<Self>) -> Option<AdmissionPermit> {
        let mut state = self.lock();
        while !state.closed && !self.has_room(&state) {
            state = self
                .released
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if state.closed {
            return None;
        }
        state.in_flight += 1;
        Some(AdmissionPermit {
            gate: Arc::clone(self),
        })
    }

    /// Cierra la compuerta y despierta al acceptor si estaba esperando
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        self.released.notify_all();
    }

    /// Conexiones en vuelo actualmente
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    /// Techo configurado
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    fn release(&self) {
        let mut state = self.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        self.released.notify_one();
    }
}

/// Lugar reservado para una conexión; se libera al soltarlo
pub struct AdmissionPermit {
    gate: Arc<AdmissionGate>,
}

impl std::fmt::Debug for AdmissionPermit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionPermit")
            .field("limit", &self.gate.limit)
            .finish()
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.gate.release();
    }
}
