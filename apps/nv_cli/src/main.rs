//! Thin binary wrapper around [`nv_cli::run_cli`], handling error display
//! and exit codes. All command logic lives in the library crate.

fn main() {
    if let Err(e) = nv_cli::run_cli() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
