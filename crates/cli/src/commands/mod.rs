//! Cart and wishlist subcommands.

pub mod cart;
pub mod wishlist;

pub use cart::CartAction;
pub use wishlist::WishlistAction;

use attar_storefront::AppError;
use attar_storefront::notice::{Notice, NoticeLevel};
use thiserror::Error;

/// Errors that end a command with a non-zero exit code.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The storefront could not be set up.
    #[error(transparent)]
    Setup(#[from] AppError),

    /// The operation was refused or failed; details were shown as notices.
    #[error("{0} did not complete")]
    NotApplied(&'static str),
}

/// Turn an operation's success flag into a command result.
pub const fn applied(ok: bool, op: &'static str) -> Result<(), CommandError> {
    if ok {
        Ok(())
    } else {
        Err(CommandError::NotApplied(op))
    }
}

/// Show shopper-facing notices at a matching log level.
pub fn print_notices(notices: &[Notice]) {
    for notice in notices {
        match notice.level {
            NoticeLevel::Success | NoticeLevel::Info => tracing::info!("{}", notice.message),
            NoticeLevel::Warning => tracing::warn!("{}", notice.message),
            NoticeLevel::Error => tracing::error!("{}", notice.message),
        }
    }
}
