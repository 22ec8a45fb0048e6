//! Subcommands of the `tapsign` binary

mod list;
mod sign;

pub(crate) use list::list_command;
pub(crate) use sign::{SignArgs, sign_command};
