// Database connection and initialization

use diesel::prelude::*;
use diesel::{Connection, PgConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use rocket::Rocket;
use rocket_db_pools::diesel::PgPool;
use rocket_db_pools::Database;
use tracing::{error, info};

use crate::audit::generate_otp;
use crate::models::{candidate_id, NewCandidate, NewMesa, NewVoter};

/// Database connection pool for the elections service
#[derive(Database)]
#[database("elections_db")]
pub struct ElectionsDb(PgPool);

// Embed migrations from the migrations directory
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run pending database migrations
pub async fn run_migrations(rocket: Rocket<rocket::Build>) -> Rocket<rocket::Build> {
    // Run migrations in a blocking task since MigrationHarness requires sync connection
    let result: Result<Vec<String>, String> = rocket::tokio::task::spawn_blocking(move || {
        let mut sync_conn = establish_sync_connection()?;

        let versions = sync_conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| format!("Failed to run migrations: {}", e))?
            .into_iter()
            .map(|v| v.to_string())
            .collect::<Vec<String>>();

        Ok(versions)
    })
    .await
    .expect("Migration task panicked");

    match result {
        Ok(versions) if versions.is_empty() => info!("database is up to date"),
        Ok(versions) => {
            info!("applied {} migration(s)", versions.len());
            for version in versions {
                info!("  - {version}");
            }
        }
        Err(e) => {
            error!("{e}");
            panic!("Database migration failed");
        }
    }

    rocket
}

/// Seed demo data: admin code, mesas, voters and candidates. Inserts are
/// idempotent, so restarting against a populated database is a no-op.
pub async fn run_seeding(rocket: Rocket<rocket::Build>) -> Rocket<rocket::Build> {
    let result: Result<(), String> = rocket::tokio::task::spawn_blocking(move || {
        let mut sync_conn = establish_sync_connection()?;

        seed_admin_code(&mut sync_conn)?;
        seed_mesas(&mut sync_conn)?;
        seed_voters(&mut sync_conn)?;
        seed_candidates(&mut sync_conn)?;
        Ok(())
    })
    .await
    .expect("Seeding task panicked");

    if let Err(e) = result {
        error!("seeding failed: {e}");
    }

    rocket
}

fn establish_sync_connection() -> Result<PgConnection, String> {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    PgConnection::establish(&database_url)
        .map_err(|e| format!("Failed to establish connection: {}", e))
}

fn seed_admin_code(conn: &mut PgConnection) -> Result<(), String> {
    use crate::schema::admin;

    let code = std::env::var("ADMIN_CODE").unwrap_or_else(|_| "ADMIN-2025".to_string());

    let inserted = diesel::insert_into(admin::table)
        .values(admin::code.eq(&code))
        .on_conflict_do_nothing()
        .execute(conn)
        .map_err(|e| format!("Failed to seed admin code: {}", e))?;

    if inserted > 0 {
        info!("seeded admin results code");
    }
    Ok(())
}

fn seed_mesas(conn: &mut PgConnection) -> Result<(), String> {
    use crate::schema::mesas;

    let demo: Vec<NewMesa> = (1..=4)
        .map(|n| NewMesa {
            name: format!("Mesa {n}"),
            code: format!("MESA-{n}-2025"),
            code_hash: String::new(),
        })
        .collect();

    let inserted = diesel::insert_into(mesas::table)
        .values(&demo)
        .on_conflict_do_nothing()
        .execute(conn)
        .map_err(|e| format!("Failed to seed mesas: {}", e))?;

    if inserted > 0 {
        info!("seeded {inserted} mesas");
    }
    Ok(())
}

const DEMO_VOTERS: [(&str, &str, &str); 20] = [
    ("1001", "Ana Torres", "T3A"),
    ("1002", "Luis Pérez", "T3A"),
    ("1003", "Marta Díaz", "T3B"),
    ("1004", "Juan Gómez", "T3B"),
    ("1005", "Sofía Rojas", "T3C"),
    ("1006", "Carlos Ruiz", "T4A"),
    ("1007", "Daniela Melo", "T4A"),
    ("1008", "Esteban Gil", "T4B"),
    ("1009", "Valeria Sol", "T4B"),
    ("1010", "Diego León", "T4C"),
    ("1011", "Paula Arias", "T5A"),
    ("1012", "Camilo Lara", "T5A"),
    ("1013", "Nicolás Rey", "T5B"),
    ("1014", "Sara Cifuentes", "T5B"),
    ("1015", "Lina Medina", "T3A"),
    ("1016", "Tomás Silva", "T4C"),
    ("1017", "Juliana Mora", "T3C"),
    ("1018", "Felipe Ospina", "T4A"),
    ("1019", "Andrés Paz", "T5B"),
    ("1020", "Laura Mesa", "T5A"),
];

fn seed_voters(conn: &mut PgConnection) -> Result<(), String> {
    use crate::schema::voters;

    let count: i64 = voters::table
        .count()
        .get_result(conn)
        .map_err(|e| format!("Failed to count voters: {}", e))?;
    if count > 0 {
        return Ok(());
    }

    let rows: Vec<NewVoter> = DEMO_VOTERS
        .iter()
        .map(|(dni, name, course)| NewVoter {
            dni: dni.to_string(),
            name: name.to_string(),
            course: course.to_string(),
            otp: generate_otp(),
        })
        .collect();

    diesel::insert_into(voters::table)
        .values(&rows)
        .on_conflict_do_nothing()
        .execute(conn)
        .map_err(|e| format!("Failed to seed voters: {}", e))?;

    info!("seeded {} demo voters", rows.len());
    Ok(())
}

const DEMO_CANDIDATES: [(&str, Option<&str>, &str, &str); 19] = [
    ("rep", Some("T3A"), "Camila Pardo", "Lista 1"),
    ("rep", Some("T3A"), "Mateo Llano", "Lista 2"),
    ("rep", Some("T3B"), "Valentina Roa", "Lista 3"),
    ("rep", Some("T3C"), "Samuel Ortiz", "Lista 1"),
    ("rep", Some("T4A"), "Isabella Niño", "Lista 2"),
    ("rep", Some("T4B"), "Juanita Vega", "Lista 4"),
    ("rep", Some("T4C"), "Santiago Melo", "Lista 1"),
    ("rep", Some("T5A"), "María B.", "Lista 2"),
    ("rep", Some("T5B"), "David C.", "Lista 3"),
    ("amb", Some("T3A"), "Héctor M.", "Reciclaje"),
    ("amb", Some("T3B"), "Elena A.", "Huerta"),
    ("amb", Some("T3C"), "Kevin R.", "Energía"),
    ("amb", Some("T4A"), "Sara Q.", "Agua"),
    ("amb", Some("T4B"), "Laura P.", "Aseo"),
    ("amb", Some("T4C"), "Brayan D.", "Reforestación"),
    ("amb", Some("T5A"), "Nicole F.", "Campañas"),
    ("amb", Some("T5B"), "Pedro Z.", "Ruido"),
    ("per", None, "Personería Lista A", ""),
    ("per", None, "Personería Lista B", ""),
];

fn seed_candidates(conn: &mut PgConnection) -> Result<(), String> {
    use crate::schema::candidates;

    let count: i64 = candidates::table
        .count()
        .get_result(conn)
        .map_err(|e| format!("Failed to count candidates: {}", e))?;
    if count > 0 {
        return Ok(());
    }

    let rows: Vec<NewCandidate> = DEMO_CANDIDATES
        .iter()
        .map(|(race, course, name, detail)| NewCandidate {
            id: candidate_id(race, *course, name),
            race: race.to_string(),
            name: name.to_string(),
            detail: detail.to_string(),
            course: course.map(str::to_string),
        })
        .collect();

    diesel::insert_into(candidates::table)
        .values(&rows)
        .on_conflict_do_nothing()
        .execute(conn)
        .map_err(|e| format!("Failed to seed candidates: {}", e))?;

    info!("seeded {} demo candidates", rows.len());
    Ok(())
}
