//! Example: detect the backend of a repository and report where it exists
//!
//! Run with: cargo run --example probe -- <remote> [local path]
//!
//! `RUST_LOG=debug` shows the detection decisions and every command run.

use std::path::PathBuf;

use vcs::{Describe, Existence, Location, VcsConfig, VcsError, VcsFactory};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    utils::logging::init_tracing();

    let mut args = std::env::args().skip(1);
    let Some(remote) = args.next() else {
        eprintln!("usage: probe <remote> [local path]");
        std::process::exit(2);
    };
    let local_path = args.next().map(PathBuf::from).unwrap_or_default();

    let config = VcsConfig::new(remote, local_path);
    let repo = VcsFactory::existence(&config)?;
    println!("backend: {}", repo.backend_type());
    println!("remote:  {}", repo.remote());

    match repo.exists(Location::Local)? {
        (Some(path), _) => println!("local:   {path}"),
        (None, _) => println!("local:   not present"),
    }

    match repo.exists(Location::Remote) {
        Ok((Some(url), results)) => println!("reached: {url} after {} probe(s)", results.len()),
        Ok((None, _)) => println!("reached: nothing"),
        Err(VcsError::NotFound { results, .. }) => {
            println!("reached: nothing");
            print!("{results}");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
