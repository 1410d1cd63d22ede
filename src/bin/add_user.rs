use qr_login_app::{domain::RepoCreateError, ports::identity::IdentityRepository};
use qr_login_persistence::sqlite::{create_pool, identities::SqliteIdentityRepository};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: add_user <handle> <secret>");
        std::process::exit(1);
    }

    let db_path = std::env::var("QR_DB").expect("QR_DB env var not set");
    let handle = &args[1];
    let secret = &args[2];

    let verifier = bcrypt::hash(secret, bcrypt::DEFAULT_COST).expect("Failed to hash secret");
    let pool = create_pool(&db_path, false);
    let identities = SqliteIdentityRepository::new(pool.clone());

    match identities.create(handle, &verifier).await {
        Ok(id) => println!("Created user [{}] with id {}", handle, id),
        Err(RepoCreateError::Conflict) => {
            eprintln!("User [{}] already exists", handle);
            std::process::exit(1);
        }
        Err(RepoCreateError::StorageError(e)) => {
            eprintln!("Failed to create user [{}]: {}", handle, e);
            std::process::exit(1);
        }
    }

    pool.close().await;
}
