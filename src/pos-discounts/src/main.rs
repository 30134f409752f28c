//! POS Discounts: coupon validation, loyalty lookup, and checkout pricing
//! from the command line.
//!
//! Builds the engines over in-memory stores (seeded with demo data unless
//! disabled in config) and prints results as JSON.

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use pos_checkout::{CheckoutRequest, CheckoutService};
use pos_core::cart::CartItem;
use pos_core::clock::{Clock, SystemClock};
use pos_core::config::AppConfig;
use pos_core::loyalty::{LoyaltyCustomer, NewLoyaltyCustomer};
use pos_coupons::{CouponEngine, InMemoryCouponStore};
use pos_loyalty::{InMemoryLoyaltyStore, LoyaltyEngine};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "pos-discounts")]
#[command(about = "Point-of-sale coupon and loyalty discount engine")]
#[command(version)]
struct Cli {
    /// Optional config file (TOML, YAML or JSON)
    #[arg(short, long, env = "POS_DISCOUNTS_CONFIG")]
    config: Option<String>,

    /// Tax rate applied at checkout (overrides config)
    #[arg(long, env = "POS_DISCOUNTS__CHECKOUT__TAX_RATE")]
    tax_rate: Option<f64>,

    /// Start with empty stores instead of the demo data
    #[arg(long, default_value_t = false)]
    no_seed: bool,

    /// Emit logs as JSON
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a coupon code against a store and cart subtotal
    ValidateCoupon {
        code: String,

        #[arg(short, long, default_value = "store1")]
        store: String,

        #[arg(long)]
        subtotal: f64,
    },

    /// List coupons, optionally for one store
    Coupons {
        #[arg(short, long)]
        store: Option<String>,
    },

    /// Price a cart and, unless --quote, complete the transaction
    Checkout {
        #[arg(short, long, default_value = "store1")]
        store: String,

        /// Cart line as product:price:quantity (repeatable)
        #[arg(short, long = "item", required = true)]
        items: Vec<String>,

        #[arg(long)]
        coupon: Option<String>,

        /// Loyalty number, email or phone
        #[arg(long)]
        customer: Option<String>,

        /// Reward name or id to redeem
        #[arg(long)]
        reward: Option<String>,

        #[arg(long)]
        transaction_id: Option<String>,

        /// Only print the quote; change nothing
        #[arg(long, default_value_t = false)]
        quote: bool,
    },

    /// Look up a loyalty member by loyalty number, email or phone
    Customer { identifier: String },

    /// Enroll a new loyalty member
    Enroll {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        phone: String,
    },

    /// List the reward catalog, or the rewards a member can redeem
    Rewards {
        #[arg(long)]
        customer: Option<String>,
    },

    /// Show the tier ladder
    Tiers,
}

struct App {
    coupons: Arc<CouponEngine>,
    loyalty: Arc<LoyaltyEngine>,
    checkout: CheckoutService,
}

impl App {
    fn build(config: &AppConfig) -> anyhow::Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let coupons = Arc::new(CouponEngine::new(
            &config.coupons,
            Arc::new(InMemoryCouponStore::new()),
            clock.clone(),
        ));
        let loyalty = Arc::new(LoyaltyEngine::new(
            &config.loyalty,
            Arc::new(InMemoryLoyaltyStore::new()),
            clock.clone(),
        ));

        if config.seed_demo_data {
            coupons.seed_demo_data()?;
            loyalty.seed_demo_data()?;
        }

        let checkout = CheckoutService::new(&config.checkout, coupons.clone(), loyalty.clone(), clock);
        Ok(Self {
            coupons,
            loyalty,
            checkout,
        })
    }

    fn customer(&self, identifier: &str) -> anyhow::Result<LoyaltyCustomer> {
        self.loyalty
            .find_loyalty_customer(identifier)
            .ok_or_else(|| anyhow!("no loyalty member matches '{identifier}'"))
    }

    fn reward_id(&self, reward: &str) -> anyhow::Result<Uuid> {
        if let Ok(id) = Uuid::parse_str(reward) {
            return Ok(id);
        }
        self.loyalty
            .list_rewards()
            .into_iter()
            .find(|r| r.name.eq_ignore_ascii_case(reward))
            .map(|r| r.id)
            .ok_or_else(|| anyhow!("no reward named '{reward}'"))
    }
}

#[derive(Serialize)]
struct CustomerView {
    customer: LoyaltyCustomer,
    progress: pos_core::loyalty::TierProgress,
    available_rewards: Vec<String>,
}

/// Parse `product:price:quantity`. Quantity defaults to 1.
fn parse_item(raw: &str) -> anyhow::Result<CartItem> {
    let mut parts = raw.split(':');
    let product = parts.next().filter(|p| !p.is_empty());
    let price = parts.next();
    let quantity = parts.next().unwrap_or("1");
    if parts.next().is_some() {
        bail!("item '{raw}' has too many fields");
    }

    let (Some(product), Some(price)) = (product, price) else {
        bail!("item '{raw}' must look like product:price:quantity");
    };
    let price: f64 = price
        .parse()
        .with_context(|| format!("invalid price in item '{raw}'"))?;
    if !(price >= 0.0) {
        bail!("price in item '{raw}' must be non-negative");
    }
    let quantity: u32 = quantity
        .parse()
        .with_context(|| format!("invalid quantity in item '{raw}'"))?;
    Ok(CartItem::new(product, price, quantity))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pos_discounts=info,pos_coupons=info,pos_loyalty=info,pos_checkout=info".into());
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let mut config = AppConfig::load_from(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });
    if let Some(rate) = cli.tax_rate {
        if !(0.0..=1.0).contains(&rate) {
            bail!("--tax-rate must be within [0, 1]");
        }
        config.checkout.tax_rate = rate;
    }
    if cli.no_seed {
        config.seed_demo_data = false;
    }

    info!(
        seed_demo_data = config.seed_demo_data,
        tax_rate = config.checkout.tax_rate,
        loyalty_enabled = config.loyalty.enabled,
        "Configuration loaded"
    );

    let app = App::build(&config)?;

    match cli.command {
        Commands::ValidateCoupon {
            code,
            store,
            subtotal,
        } => print_json(&app.coupons.validate_coupon(&code, &store, subtotal)),

        Commands::Coupons { store } => {
            app.coupons.expire_lapsed_coupons();
            let coupons = match store {
                Some(store) => app.coupons.coupons_for_store(&store),
                None => app.coupons.list_coupons(),
            };
            print_json(&coupons)
        }

        Commands::Checkout {
            store,
            items,
            coupon,
            customer,
            reward,
            transaction_id,
            quote,
        } => {
            let items = items
                .iter()
                .map(|raw| parse_item(raw))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let mut request = CheckoutRequest::new(store, items);
            request.coupon_code = coupon;
            request.transaction_id = transaction_id;
            if let Some(identifier) = customer {
                request.loyalty_customer_id = Some(app.customer(&identifier)?.id);
            }
            if let Some(reward) = reward {
                request.reward_id = Some(app.reward_id(&reward)?);
            }

            if quote {
                print_json(&app.checkout.quote(&request)?)
            } else {
                print_json(&app.checkout.complete(&request)?)
            }
        }

        Commands::Customer { identifier } => {
            let customer = app.customer(&identifier)?;
            let view = CustomerView {
                progress: customer.next_tier_progress(),
                available_rewards: app
                    .loyalty
                    .available_rewards(&customer)
                    .into_iter()
                    .map(|r| r.name)
                    .collect(),
                customer,
            };
            print_json(&view)
        }

        Commands::Enroll { name, email, phone } => {
            let customer = app
                .loyalty
                .enroll_customer(NewLoyaltyCustomer { name, email, phone })?;
            print_json(&customer)
        }

        Commands::Rewards { customer } => match customer {
            Some(identifier) => {
                let customer = app.customer(&identifier)?;
                print_json(&app.loyalty.available_rewards(&customer))
            }
            None => print_json(&app.loyalty.list_rewards()),
        },

        Commands::Tiers => print_json(&app.loyalty.tiers()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_item() {
        let item = parse_item("shirt:19.99:2").unwrap();
        assert_eq!(item.product_id, "shirt");
        assert_eq!(item.price, 19.99);
        assert_eq!(item.quantity, 2);

        assert_eq!(parse_item("mug:5").unwrap().quantity, 1);
    }

    #[test]
    fn test_parse_item_rejects_garbage() {
        assert!(parse_item("shirt").is_err());
        assert!(parse_item(":5:1").is_err());
        assert!(parse_item("shirt:abc:1").is_err());
        assert!(parse_item("shirt:-1:1").is_err());
        assert!(parse_item("shirt:5:1:extra").is_err());
    }

    #[test]
    fn test_cli_parses_checkout() {
        let cli = Cli::try_parse_from([
            "pos-discounts",
            "checkout",
            "--item",
            "tv:600:1",
            "--coupon",
            "SAVE10",
            "--quote",
        ])
        .unwrap();
        match cli.command {
            Commands::Checkout {
                items,
                coupon,
                quote,
                store,
                ..
            } => {
                assert_eq!(items, vec!["tv:600:1".to_string()]);
                assert_eq!(coupon.as_deref(), Some("SAVE10"));
                assert!(quote);
                assert_eq!(store, "store1");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_app_with_demo_data() {
        let app = App::build(&AppConfig::default()).unwrap();
        assert_eq!(app.customer("LOY123456").unwrap().name, "John Doe");
        assert!(app.reward_id("free shipping").is_ok());
        assert!(app.reward_id("Free Yacht").is_err());
    }
}
