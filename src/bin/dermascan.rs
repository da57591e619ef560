//! DermaScan CLI Tool
//!
//! Command-line front end for cropping skin photographs, classifying them with
//! the remote service and downloading the resulting report.

#[cfg(feature = "cli")]
use dermascan::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Please rebuild with --features cli");
    std::process::exit(1);
}
