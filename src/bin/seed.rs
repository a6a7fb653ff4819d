use chrono::Utc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use gradkart_core::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    events::EventBus,
    services::auth_service,
    state::AppState,
};

/// Demo fixtures for local development. Unlike the old UI, empty storage
/// stays empty; demo content only exists if this binary put it there.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gradkart_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let pool = create_pool(&config.database_url).await?;
    let orm = create_orm_conn(&pool);
    run_migrations(&orm).await?;

    let state = AppState {
        pool: pool.clone(),
        orm,
        events: EventBus::new(),
    };

    let admin_id = auth_service::ensure_admin_account(&state, &config).await?;

    let seller_id = ensure_student(&pool, "Asha Nair", "asha@demo.gradkart.app", "NIT Calicut").await?;
    let buyer_id = ensure_student(&pool, "Rahul Mehta", "rahul@demo.gradkart.app", "IIT Bombay").await?;
    seed_listings(&pool, seller_id).await?;

    println!("Seed completed. Admin ID: {admin_id}, Seller ID: {seller_id}, Buyer ID: {buyer_id}");
    Ok(())
}

async fn ensure_student(
    pool: &sqlx::SqlitePool,
    name: &str,
    email: &str,
    college: &str,
) -> anyhow::Result<Uuid> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    if let Some((id,)) = row {
        println!("User {email} already present");
        return Ok(id);
    }

    let id = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO users
            (id, name, email, phone, college, role, status, verification_type,
             is_blocked, location_skipped, created_at)
        VALUES ($1, $2, $3, '', $4, 'user', 'approved', 'email', 0, 1, $5)
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(email)
    .bind(college)
    .bind(now)
    .execute(pool)
    .await?;

    sqlx::query("INSERT INTO wallets (user_id, withdrawable, usable, updated_at) VALUES ($1, 0, 0, $2)")
        .bind(id)
        .bind(now)
        .execute(pool)
        .await?;

    println!("Seeded user {email}");
    Ok(id)
}

async fn seed_listings(pool: &sqlx::SqlitePool, seller_id: Uuid) -> anyhow::Result<()> {
    let existing: (i64,) = sqlx::query_as("SELECT count(*) FROM listings WHERE seller_id = $1")
        .bind(seller_id)
        .fetch_one(pool)
        .await?;
    if existing.0 > 0 {
        println!("Demo listings already present");
        return Ok(());
    }

    let listings = vec![
        ("iPhone 13 128GB", "electronics", 32000_i64, "Like new"),
        ("Study table with lamp", "furniture", 2500, "Good"),
        ("GATE CS prep book set", "books", 1200, "Fair"),
        ("Hero Sprint cycle", "vehicles", 3800, "Good"),
    ];

    let now = Utc::now();
    for (title, category, price, condition) in listings {
        sqlx::query(
            r#"
            INSERT INTO listings
                (id, seller_id, title, category, price, condition, images,
                 status, views, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, '[]', 'active', 0, 0, $7, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(seller_id)
        .bind(title)
        .bind(category)
        .bind(price)
        .bind(condition)
        .bind(now)
        .execute(pool)
        .await?;
    }

    println!("Seeded demo listings");
    Ok(())
}
