//! # Cola de Despacho
//! src/dispatch/queue.rs
//!
//! Buzón acotado de conexiones pendientes entre el acceptor y los workers.
//!
//! - `try_enqueue` nunca bloquea: si la cola está llena devuelve el elemento
//!   a quien llama, que es responsable de cerrarlo.
//! - `dequeue` bloquea con un `Condvar` hasta que haya algo que sacar.
//!
//! El orden es FIFO: la conexión que más tiempo lleva esperando es la
//! primera en ser atendida.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Motivo por el que un elemento no entró a la cola
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// La cola alcanzó su capacidad
    #[error("dispatch queue is full (capacity {capacity})")]
    Full { capacity: usize },

    /// La cola fue cerrada por el apagado
    #[error("dispatch queue is closed")]
    Closed,
}

/// Elemento rechazado, devuelto a quien intentó encolarlo
#[derive(Debug)]
pub struct Rejected<T> {
    pub item: T,
    pub reason: RejectReason,
}

impl<T> Rejected<T> {
    /// Recupera el elemento rechazado
    pub fn into_inner(self) -> T {
        self.item
    }
}

/// Estado interno protegido por el mutex
struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
    enqueued: u64,
    rejected: u64,
}

/// Cola FIFO acotada y thread-safe
///
/// Clonar la cola comparte el mismo buffer (como un handle).
pub struct DispatchQueue<T> {
    state: Arc<Mutex<QueueState<T>>>,
    not_empty: Arc<Condvar>,
    capacity: usize,
}

impl<T> DispatchQueue<T> {
    /// Crea una nueva cola con capacidad máxima `capacity` (Q)
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity),
                closed: false,
                enqueued: 0,
                rejected: 0,
            })),
            not_empty: Arc::new(Condvar::new()),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Intenta encolar sin bloquear
    ///
    /// Retorna `Ok(())` y despierta a un worker si había lugar. Si la cola
    /// está llena (o cerrada) el elemento vuelve en `Rejected` y el tamaño
    /// de la cola no cambia.
    pub fn try_enqueue(&self, item: T) -> Result<(), Rejected<T>> {
        let mut state = self.lock();

        if state.closed {
            state.rejected += 1;
            return Err(Rejected {
                item,
                reason: RejectReason::Closed,
            });
        }

        if state.items.len() >= self.capacity {
            state.rejected += 1;
            return Err(Rejected {
                item,
                reason: RejectReason::Full {
                    capacity: self.capacity,
                },
            });
        }

        state.items.push_back(item);
        state.enqueued += 1;

        // Notificar a un worker esperando
        self.not_empty.notify_one();

        Ok(())
    }

    /// Desencola el elemento más antiguo
    ///
    /// Bloquea hasta que haya un elemento disponible. Retorna `None` solo
    /// cuando la cola fue cerrada y ya no quedan elementos.
    pub fn dequeue(&self) -> Option<T> {
        let mut state = self.lock();

        loop {
            if let Some(item) = state.items.pop_front() {
                return Some(item);
            }

            if state.closed {
                return None;
            }

            // Esperar a que haya elementos
            state = self
                .not_empty
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Cierra la cola y despierta a todos los workers
    ///
    /// Los elementos ya encolados se siguen entregando.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        self.not_empty.notify_all();
    }

    /// Retorna el tamaño actual de la cola
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Verifica si la cola está vacía
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retorna la capacidad máxima
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Verifica si la cola está llena
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    /// Obtiene estadísticas de la cola
    pub fn stats(&self) -> QueueStats {
        let state = self.lock();
        QueueStats {
            queued: state.items.len(),
            capacity: self.capacity,
            enqueued_total: state.enqueued,
            rejected_total: state.rejected,
        }
    }
}

/// Estadísticas de la cola
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct QueueStats {
    pub queued: usize,
    pub capacity: usize,
    pub enqueued_total: u64,
    pub rejected_total: u64,
}

impl<T> Clone for DispatchQueue<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            not_empty: Arc::clone(&self.not_empty),
            capacity: self.capacity,
        }
    }
}
