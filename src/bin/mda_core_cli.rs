use mda_core::{
    cli::{run_cli, usage, CliError},
    init,
};

fn main() {
    init();

    if let Err(err) = run_cli() {
        eprintln!("Error: {err}");
        if matches!(err, CliError::Input(_)) {
            eprintln!("{}", usage());
        }
        std::process::exit(1);
    }
}
