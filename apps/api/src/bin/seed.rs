//! Seeds an empty store with an admin account and a sample catalog.
//!
//! ```text
//! cargo run -p tailor-api --bin seed
//! ```
//!
//! Safe to re-run: the admin is skipped when the email exists and the
//! catalog is skipped when any product exists.

use anyhow::Context;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tailor_api::auth::hash_password;
use tailor_api::AppConfig;
use tailor_core::commands::{NewProduct, NewVariant};
use tailor_core::Role;
use tailor_db::{Database, NewUser};

const ADMIN_EMAIL: &str = "admin@tailorcraft.com";

const CATEGORIES: [&str; 8] = [
    "Shirts", "Pants", "Suits", "Kurtas", "Blouses", "Lehenga", "Sarees", "Jackets",
];
const SIZES: [&str; 6] = ["XS", "S", "M", "L", "XL", "XXL"];
const COLORS: [&str; 8] = ["Black", "White", "Blue", "Red", "Green", "Gray", "Navy", "Beige"];
const FABRICS: [&str; 6] = ["Cotton", "Linen", "Silk", "Wool", "Polyester", "Denim"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::load().context("Invalid configuration")?;
    let db = Database::new(config.db_config())
        .await
        .context("Failed to open database")?;

    seed_admin(&db).await?;
    seed_catalog(&db).await?;

    info!("Seeding complete");
    Ok(())
}

async fn seed_admin(db: &Database) -> anyhow::Result<()> {
    let users = db.users();
    if users.find_by_email(ADMIN_EMAIL).await?.is_some() {
        info!(email = ADMIN_EMAIL, "Admin exists, skipping");
        return Ok(());
    }

    let password = std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string());
    users
        .create(&NewUser {
            name: "Admin User".to_string(),
            email: ADMIN_EMAIL.to_string(),
            password_hash: hash_password(&password)?,
            phone: None,
            role: Role::Admin,
        })
        .await?;

    info!(email = ADMIN_EMAIL, "Created admin user");
    Ok(())
}

async fn seed_catalog(db: &Database) -> anyhow::Result<()> {
    let products = db.products();
    if products.count().await? > 0 {
        info!("Catalog not empty, skipping products");
        return Ok(());
    }

    let mut created = 0;
    for category in CATEGORIES {
        for i in 1..=5 {
            products.create(&sample_product(category, i)).await?;
            created += 1;
        }
    }

    info!(products = created, "Created sample products");
    Ok(())
}

fn sample_product(category: &str, index: u32) -> NewProduct {
    let mut rng = rand::thread_rng();

    let price_rupees: i64 = rng.gen_range(1_000..6_000);
    let markup_rupees: i64 = rng.gen_range(0..1_000);
    let variants = (0..rng.gen_range(2..=4))
        .map(|_| NewVariant {
            size: SIZES.choose(&mut rng).map(|s| s.to_string()),
            color: COLORS.choose(&mut rng).map(|s| s.to_string()),
            fabric: FABRICS.choose(&mut rng).map(|s| s.to_string()),
            stock: rng.gen_range(5..55),
            price_adjustment_paise: rng.gen_range(-250..250) * 100,
        })
        .collect();

    NewProduct {
        name: format!("{category} Design {index}"),
        description: Some(format!(
            "Premium quality {} made with the finest materials. Perfect for any occasion.",
            category.to_lowercase()
        )),
        price_paise: price_rupees * 100,
        original_price_paise: Some((price_rupees + markup_rupees) * 100),
        category: category.to_string(),
        material: Some("Cotton Blend".to_string()),
        stock: rng.gen_range(10..110),
        is_customizable: index % 2 == 0,
        custom_price_multiplier_bps: None,
        featured: index == 1,
        images: vec![
            format!("https://picsum.photos/seed/{category}{index}/400/400"),
            format!("https://picsum.photos/seed/{category}{index}b/400/400"),
        ],
        variants,
    }
}
