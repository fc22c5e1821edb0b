use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::CommandFactory;

#[path = "src/cli.rs"]
#[allow(dead_code)]
mod cli;

/// Writes `prepdesk.1` plus one page per command (`prepdesk-checkin.1`,
/// `prepdesk-token-inspect.1`, ...) into `$OUT_DIR/man`.
fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo::rerun-if-changed=src/cli.rs");

    let man_dir = PathBuf::from(std::env::var_os("OUT_DIR").ok_or("OUT_DIR is unset")?).join("man");
    fs::create_dir_all(&man_dir)?;

    let mut pending = vec![cli::Cli::command()];
    while let Some(cmd) = pending.pop() {
        let page = cmd.get_name().to_owned();
        pending.extend(
            cmd.get_subcommands()
                .filter(|sub| !sub.is_hide_set())
                .map(|sub| sub.clone().name(format!("{page}-{}", sub.get_name()))),
        );

        let mut roff = Vec::new();
        clap_mangen::Man::new(cmd).render(&mut roff)?;
        fs::write(man_dir.join(format!("{page}.1")), roff)?;
    }
    Ok(())
}
