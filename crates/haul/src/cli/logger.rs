use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt;

/// Default directive by `-v` count. `RUST_LOG` still adds its own.
fn default_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "haul=info",
        1 => "haul=debug",
        _ => "haul=trace",
    }
}

/// Install the stderr subscriber. Stdout stays reserved for command output.
pub fn init(verbose: u8) {
    let directive: Directive = match default_directive(verbose).parse() {
        Ok(directive) => directive,
        Err(_) => return,
    };
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}
