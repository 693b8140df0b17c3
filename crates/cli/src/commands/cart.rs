//! Cart commands.
//!
//! # Usage
//!
//! ```bash
//! attar cart list
//! attar cart add -i p1 -n "Rose Absolute" -p 24.50 -q 2 --size 50ml
//! attar cart update p1 3
//! attar cart remove p1 --size 50ml
//! attar cart clear
//! ```

use attar_core::CartItem;
use attar_core::types::numeric::{parse_price, parse_quantity};
use attar_storefront::Storefront;
use clap::{Args, Subcommand};
use rust_decimal::Decimal;

use super::{CommandError, applied};

#[derive(Subcommand)]
pub enum CartAction {
    /// Show every line with the subtotal
    List,
    /// Show the total quantity
    Count,
    /// Add a line
    Add(CartItemArgs),
    /// Remove lines by product ID
    Remove {
        id: String,
        /// Only remove this size; all sizes if omitted
        #[arg(short, long)]
        size: Option<String>,
    },
    /// Set the quantity of a product
    Update { id: String, quantity: u32 },
    /// Add the line if absent, remove it if present
    Toggle(CartItemArgs),
    /// Remove every line
    Clear,
}

#[derive(Args)]
pub struct CartItemArgs {
    /// Product ID
    #[arg(short, long)]
    id: String,

    /// Display name
    #[arg(short, long)]
    name: String,

    /// Unit price
    #[arg(short, long, value_parser = parse_price)]
    price: Decimal,

    /// Quantity
    #[arg(short, long, default_value = "1", value_parser = parse_quantity)]
    quantity: u32,

    /// Selected size
    #[arg(short, long)]
    size: Option<String>,

    /// Personalization text
    #[arg(long)]
    personalization: Option<String>,

    /// Image URL
    #[arg(long)]
    image: Option<String>,
}

impl From<CartItemArgs> for CartItem {
    fn from(args: CartItemArgs) -> Self {
        let mut item = Self::new(args.id, args.name, args.price).with_quantity(args.quantity);
        item.selected_size = args.size;
        item.personalization = args.personalization;
        if let Some(image) = args.image {
            item.image = image;
        }
        item
    }
}

pub async fn run(storefront: &Storefront, action: CartAction) -> Result<(), CommandError> {
    let cart = storefront.cart();
    match action {
        CartAction::List => {
            for item in cart.items() {
                tracing::info!(
                    "{} x{} {}{} @ {} = {}",
                    item.id,
                    item.effective_quantity(),
                    item.name,
                    item.selected_size
                        .as_deref()
                        .map(|size| format!(" ({size})"))
                        .unwrap_or_default(),
                    item.price,
                    item.line_total()
                );
            }
            tracing::info!("Subtotal: {} ({} items)", cart.subtotal(), cart.count());
            Ok(())
        }
        CartAction::Count => {
            tracing::info!("{}", cart.count());
            Ok(())
        }
        CartAction::Add(args) => applied(cart.add(args.into()).await, "add"),
        CartAction::Remove { id, size } => {
            applied(cart.remove(&id, size.as_deref()).await, "remove")
        }
        CartAction::Update { id, quantity } => {
            applied(cart.update_quantity(&id, quantity).await, "update")
        }
        CartAction::Toggle(args) => applied(cart.toggle(args.into()).await, "toggle"),
        CartAction::Clear => applied(cart.clear().await, "clear"),
    }
}
