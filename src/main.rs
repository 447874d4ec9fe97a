//! Ge.tt FUSE filesystem for Linux
//!
//! Mounts a Ge.tt file-sharing account at a local directory. Shares show up
//! as top-level directories; file content is downloaded on first read and
//! kept in memory until unmount.

use std::path::Path;
use std::process;
use std::sync::{mpsc, Arc};

use anyhow::{Context, Result};
use clap::{Arg, Command};
use fuser::MountOption;
use log::info;

use gett_fuse::fuse::filesystem::GettFuse;
use gett_fuse::gett_service::client::{GettClient, RemoteContentSource, RemoteShareClient};
use gett_fuse::gett_service::models::AccountSnapshot;
use gett_fuse::vfs::engine::GettVfs;

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let matches = cli().try_get_matches().unwrap_or_else(|err| {
        let _ = err.print();
        match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                process::exit(0)
            }
            _ => process::exit(1),
        }
    });

    let mountpoint = matches.get_one::<String>("mountpoint").unwrap();
    let apikey = matches.get_one::<String>("apikey").unwrap();
    let email = matches.get_one::<String>("email").unwrap();
    let password = matches.get_one::<String>("password").unwrap();

    info!("Starting Ge.tt FUSE filesystem");
    info!("Mount point: {}", mountpoint);

    // Check if mountpoint exists and is a directory
    let mount_path = Path::new(mountpoint);
    if !mount_path.exists() {
        return Err(anyhow::anyhow!("Mount point does not exist: {}", mountpoint));
    }
    if !mount_path.is_dir() {
        return Err(anyhow::anyhow!(
            "Mount point is not a directory: {}",
            mountpoint
        ));
    }

    // Create runtime manually; FUSE callbacks block on its handle
    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;

    // Login and capture the account snapshot before mounting anything. A
    // failure here aborts the mount instead of exposing an empty tree.
    let client = Arc::new(GettClient::new());
    let snapshot = runtime.block_on(async {
        let quota = client
            .login(apikey, email, password)
            .await
            .context("Ge.tt login failed, not mounting")?;
        let shares = client
            .list_shares()
            .await
            .context("Could not list shares, not mounting")?;
        Ok::<_, anyhow::Error>(AccountSnapshot { quota, shares })
    })?;

    let vfs = Arc::new(GettVfs::from_snapshot(
        snapshot,
        Arc::clone(&client) as Arc<dyn RemoteShareClient>,
        Arc::clone(&client) as Arc<dyn RemoteContentSource>,
    ));
    let fs = GettFuse::new(vfs, runtime.handle().clone());

    let options = vec![
        MountOption::RW,
        MountOption::FSName("gett".to_string()),
        MountOption::AutoUnmount,
    ];
    let session = fuser::spawn_mount2(fs, mountpoint, &options)
        .with_context(|| format!("Failed to mount at {}", mountpoint))?;

    info!("Mounted at {}. Press Ctrl+C to unmount.", mountpoint);

    // Wait for interrupt signal, then drop the session to unmount
    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .context("Error setting Ctrl-C handler")?;

    let _ = rx.recv();
    info!("Received interrupt signal, unmounting...");
    drop(session);
    info!("Filesystem unmounted");
    Ok(())
}

fn cli() -> Command {
    Command::new("gett-fuse")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Mount a Ge.tt account as a FUSE filesystem")
        .arg(
            Arg::new("mountpoint")
                .help("Directory to mount the account at")
                .required(true)
                .num_args(1),
        )
        .arg(
            Arg::new("apikey")
                .help("Ge.tt API key")
                .required(true)
                .num_args(1),
        )
        .arg(
            Arg::new("email")
                .help("Account email")
                .required(true)
                .num_args(1),
        )
        .arg(
            Arg::new("password")
                .help("Account password")
                .required(true)
                .num_args(1),
        )
}
