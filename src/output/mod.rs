mod progress;
mod styling;
mod summary;
mod tables;

pub use progress::{waiting_spinner, PhaseProgress};
pub use styling::{dim, magenta_bold};
pub use summary::{print_results, print_submission};

/// Prints the `Pipeforge` banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("🛠️ Pipeforge"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("CI Pipeline Generator")
    );
}
