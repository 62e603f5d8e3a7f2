//! # swimraft-cli::commands::list_protocols
//!
//! Implements the `list-protocols` subcommand.

use anyhow::Result;
use swimraft_types::envelope::ProtoTag;

const PROTOCOLS: &[(&str, ProtoTag, &str)] = &[
    ("swim", ProtoTag::SWIM, "always hosted"),
    ("raft", ProtoTag::RAFT, "hosted when scenario.initial.raft is set"),
    ("limbo", ProtoTag::LIMBO, "hosted when scenario.initial.limbo is set"),
];

pub fn exec() -> Result<()> {
    println!("Available protocols:");
    println!("{:<8} | {:<8} | {}", "Name", "ProtoTag", "Hosted");
    println!("{:-<8}-|-{:-<8}-|-{:-<30}", "", "", "");

    for (name, tag, note) in PROTOCOLS {
        println!("{:<8} | {:<8} | {}", name, tag.0, note);
    }

    Ok(())
}
