use clap::Parser;
use starpath_client::cli::{CliArgs, OutputMode};
use starpath_client::session::Session;
use starpath_core::ConfigError;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();
    tracing::info!("Starpath runtime v{}", env!("CARGO_PKG_VERSION"));

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Error: cannot read current directory: {}", e);
            std::process::exit(1);
        }
    };
    let session = match Session::resolve(args, &cwd) {
        Ok(session) => session,
        Err(e) => exit_with_config_error(e),
    };

    match session.args.output {
        OutputMode::Headless => match starpath_client::headless::run_headless(&session) {
            Ok(summary) => println!("{}", summary.hud.status_line()),
            Err(e) => exit_with_config_error(e),
        },
        OutputMode::Window => run_engine(session),
    }
}

fn exit_with_config_error(e: ConfigError) -> ! {
    eprintln!("Error: {}", e);
    if let ConfigError::Parse { .. } | ConfigError::Scene(_) = e {
        eprintln!("  Fix starpath.yaml or remove it to fly the built-in tour.");
    }
    std::process::exit(1);
}

fn run_engine(session: Session) {
    let event_loop = match winit::event_loop::EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            eprintln!("Error: failed to create event loop: {}", e);
            std::process::exit(1);
        }
    };
    event_loop.set_control_flow(winit::event_loop::ControlFlow::Poll);

    let mut engine = starpath_client::engine::Engine::new(session);

    if let Err(e) = event_loop.run_app(&mut engine) {
        eprintln!("Error: event loop failed: {}", e);
        std::process::exit(1);
    }
}
