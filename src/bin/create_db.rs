use qr_login_app::ports::identity::IdentityRepository;
use qr_login_persistence::sqlite::{identities::SqliteIdentityRepository, open_database};

const DEMO_USERS: [(&str, &str); 2] = [("user@x.com", "password"), ("user2@x.com", "password")];

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let db_path = std::env::var("QR_DB").expect("QR_DB env var not set");
    let path = std::path::Path::new(&db_path);
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).expect("Failed to create parent directory for DB");
        println!("Created parent directory for DB at {}", parent.display());
    }

    if path.exists() {
        std::fs::remove_file(path).expect("Failed to remove existing DB");
        println!("Removed existing DB at {}", db_path);
    }

    let pool = open_database(&db_path)
        .await
        .expect("Failed to create tables");
    println!("Created new DB at {}", db_path);

    let identities = SqliteIdentityRepository::new(pool.clone());
    for (handle, secret) in DEMO_USERS {
        let verifier = bcrypt::hash(secret, bcrypt::DEFAULT_COST).expect("Failed to hash secret");
        let id = identities
            .create(handle, &verifier)
            .await
            .unwrap_or_else(|e| panic!("Failed to create user {}: {}", handle, e));
        println!("Created user {} with id {}", handle, id);
    }

    pool.close().await;
}
