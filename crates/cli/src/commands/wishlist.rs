//! Wishlist commands.
//!
//! # Usage
//!
//! ```bash
//! attar wishlist list
//! attar wishlist add -i w1 -n "Oud Royale" -p 45
//! attar wishlist move w1
//! ```

use attar_core::WishlistItem;
use attar_core::types::numeric::parse_price;
use attar_storefront::Storefront;
use clap::{Args, Subcommand};
use rust_decimal::Decimal;

use super::{CommandError, applied};

#[derive(Subcommand)]
pub enum WishlistAction {
    /// Show every entry
    List,
    /// Show the number of entries
    Count,
    /// Add an entry
    Add(WishlistItemArgs),
    /// Remove entries by product ID
    Remove {
        id: String,
        /// Only remove this size; all sizes if omitted
        #[arg(short, long)]
        size: Option<String>,
    },
    /// Add the entry if absent, remove it if present
    Toggle(WishlistItemArgs),
    /// Move an entry into the cart
    Move { id: String },
    /// Remove every entry
    Clear,
}

#[derive(Args)]
pub struct WishlistItemArgs {
    /// Product ID
    #[arg(short, long)]
    id: String,

    /// Display name
    #[arg(short, long)]
    name: String,

    /// Unit price
    #[arg(short, long, value_parser = parse_price)]
    price: Decimal,

    /// Selected size
    #[arg(short, long)]
    size: Option<String>,

    /// Category, e.g. "oriental"
    #[arg(short, long)]
    category: Option<String>,
}

impl From<WishlistItemArgs> for WishlistItem {
    fn from(args: WishlistItemArgs) -> Self {
        let mut item = Self::new(args.id, args.name, args.price);
        item.selected_size = args.size;
        if let Some(category) = args.category {
            item.category = category;
        }
        item
    }
}

pub async fn run(storefront: &Storefront, action: WishlistAction) -> Result<(), CommandError> {
    let wishlist = storefront.wishlist();
    match action {
        WishlistAction::List => {
            for item in wishlist.items() {
                let added = item
                    .added_at
                    .map(|at| at.format("%Y-%m-%d").to_string())
                    .unwrap_or_default();
                tracing::info!("{} {} @ {} {}", item.id, item.name, item.price, added);
            }
            tracing::info!("{} saved", wishlist.count());
            Ok(())
        }
        WishlistAction::Count => {
            tracing::info!("{}", wishlist.count());
            Ok(())
        }
        WishlistAction::Add(args) => applied(wishlist.add(args.into()).await, "add"),
        WishlistAction::Remove { id, size } => {
            applied(wishlist.remove(&id, size.as_deref()).await, "remove")
        }
        WishlistAction::Toggle(args) => applied(wishlist.toggle(args.into()).await, "toggle"),
        WishlistAction::Move { id } => applied(storefront.move_to_cart(&id).await, "move"),
        WishlistAction::Clear => applied(wishlist.clear().await, "clear"),
    }
}
