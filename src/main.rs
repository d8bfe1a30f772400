//! # Static File Server - Entry Point
//! src/main.rs
//!
//! Resuelve la configuración, instala los logs, hace bind (que valida la
//! configuración) y corre el servidor hasta Ctrl-C.

use anyhow::Context;
use static_server::config::Config;
use static_server::error::{exit_code, ServerError};
use static_server::logging;
use static_server::server::Server;
use std::process::ExitCode;
use tracing::{error, info};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::from(exit_code::SUCCESS as u8),
        Err(e) => {
            error!("{e:#}");
            eprintln!("💥 Error fatal: {e:#}");
            match e.downcast_ref::<ServerError>() {
                Some(server_err) => ExitCode::from(server_err.exit_code() as u8),
                None => ExitCode::from(exit_code::GENERAL_ERROR as u8),
            }
        }
    }
}

fn run() -> anyhow::Result<()> {
    let config = Config::new();
    logging::init(config.log_dir()).context("Failed to set up logging")?;

    // `bind` valida la configuración antes de abrir el puerto
    let server = Server::bind(config).context("Failed to start server")?;
    server.config().print_summary();
    info!(addr = %server.local_addr(), "static file server ready");

    let handle = server.shutdown_handle();
    ctrlc::set_handler(move || handle.shutdown()).context("Failed to set Ctrl-C handler")?;

    server.run().context("Server stopped with an error")?;

    info!("server stopped");
    Ok(())
}
