use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result, miette};
use roomlock::application::reservation::ReservationService;
use roomlock::application::simulation::{SANDBOX_KEY_ID, simulate};
use roomlock::config::GatewayConfig;
use roomlock::domain::ports::{
    BookingRequestStoreBox, IdentityProvider, PaymentGatewayBox, RoomStore, RoomStoreBox,
};
use roomlock::domain::room::Room;
use roomlock::error::StoreError;
use roomlock::infrastructure::identity::{DevIdentityProvider, RemoteIdentityProvider};
use roomlock::infrastructure::in_memory::{InMemoryBookingRequestStore, InMemoryRoomStore};
use roomlock::infrastructure::razorpay::RazorpayClient;
#[cfg(feature = "storage-rocksdb")]
use roomlock::infrastructure::rocksdb::RocksDBStore;
use roomlock::infrastructure::sandbox::SandboxGateway;
use roomlock::infrastructure::signature::SignatureVerifier;
use roomlock::interfaces::csv::report_writer::ReportWriter;
use roomlock::interfaces::csv::room_reader::RoomReader;
use roomlock::interfaces::http::{AppState, router};
use roomlock::telemetry::setup_tracing;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the reservation HTTP API.
    Serve(ServeArgs),
    /// Race simulated renters for each room against the sandbox gateway and
    /// print the final booking requests and rooms as CSV.
    Simulate {
        /// Rooms CSV file (id,owner_id,title,monthly_price)
        #[arg(long)]
        rooms: PathBuf,

        /// Concurrent renters per room
        #[arg(long, default_value_t = 4)]
        renters: usize,

        /// Path to persistent database (optional). If provided, uses RocksDB.
        #[arg(long, env = "ROOMLOCK_DB_PATH")]
        db_path: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ServeArgs {
    /// Rooms CSV file to seed the room store with
    #[arg(long)]
    rooms: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "ROOMLOCK_DB_PATH")]
    db_path: Option<PathBuf>,

    #[arg(long, env = "ROOMLOCK_BIND", default_value = "0.0.0.0:3000")]
    bind: String,

    /// Use the in-memory sandbox gateway and treat bearers as user ids.
    #[arg(long)]
    sandbox: bool,

    #[arg(long, env = "RAZORPAY_KEY_ID")]
    key_id: Option<String>,

    #[arg(long, env = "RAZORPAY_KEY_SECRET", hide_env_values = true)]
    key_secret: Option<String>,

    #[arg(long, env = "RAZORPAY_BASE_URL")]
    gateway_url: Option<String>,

    #[arg(long, env = "GATEWAY_TIMEOUT_SECS")]
    gateway_timeout_secs: Option<u64>,

    /// Identity endpoint resolving a bearer token to `{"id": ...}`
    #[arg(long, env = "IDENTITY_URL")]
    identity_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    setup_tracing();

    match Cli::parse().command {
        Command::Serve(args) => serve(args).await,
        Command::Simulate {
            rooms,
            renters,
            db_path,
        } => {
            let (bookings, room_store) = open_stores(db_path.as_deref())?;
            let rooms = read_rooms(&rooms)?;
            let report = simulate(bookings, room_store, rooms, renters)
                .await
                .into_diagnostic()?;

            let stdout = io::stdout();
            let mut writer = ReportWriter::new(stdout.lock());
            writer
                .write_booking_requests(report.booking_requests)
                .into_diagnostic()?;
            writer.write_rooms(report.rooms).into_diagnostic()?;
            Ok(())
        }
    }
}

fn read_rooms(path: &Path) -> Result<Vec<Room>> {
    let file = File::open(path).into_diagnostic()?;
    let mut rooms = Vec::new();
    for room in RoomReader::new(file).rooms() {
        match room {
            Ok(room) => rooms.push(room),
            Err(e) => warn!(error = %e, "skipping room row"),
        }
    }
    Ok(rooms)
}

fn open_stores(db_path: Option<&Path>) -> Result<(BookingRequestStoreBox, RoomStoreBox)> {
    #[cfg(feature = "storage-rocksdb")]
    if let Some(path) = db_path {
        let store = RocksDBStore::open(path).into_diagnostic()?;
        info!(path = %path.display(), "using RocksDB storage");
        return Ok((Box::new(store.clone()), Box::new(store)));
    }

    #[cfg(not(feature = "storage-rocksdb"))]
    if db_path.is_some() {
        warn!("--db-path ignored: built without the storage-rocksdb feature, using in-memory storage");
    }

    Ok((
        Box::new(InMemoryBookingRequestStore::new()),
        Box::new(InMemoryRoomStore::new()),
    ))
}

async fn serve(args: ServeArgs) -> Result<()> {
    let (bookings, rooms) = open_stores(args.db_path.as_deref())?;

    if let Some(path) = &args.rooms {
        let mut seeded = 0usize;
        for room in read_rooms(path)? {
            match rooms.insert(room).await {
                Ok(()) => seeded += 1,
                Err(StoreError::Duplicate(id)) => debug!(room_id = %id, "room already stored"),
                Err(e) => return Err(e).into_diagnostic(),
            }
        }
        info!(seeded, "rooms seeded");
    }

    let (gateway, verifier, identity) = if args.sandbox {
        let key_id = args.key_id.unwrap_or_else(|| SANDBOX_KEY_ID.to_string());
        let secret = args
            .key_secret
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        warn!("sandbox mode: payments are simulated and bearers are trusted as user ids");
        (
            Box::new(SandboxGateway::new(key_id, &secret).into_diagnostic()?) as PaymentGatewayBox,
            SignatureVerifier::new(&secret).into_diagnostic()?,
            Arc::new(DevIdentityProvider) as Arc<dyn IdentityProvider>,
        )
    } else {
        let config = GatewayConfig::new(
            args.key_id,
            args.key_secret,
            args.gateway_url,
            args.gateway_timeout_secs,
        )
        .into_diagnostic()?;
        let identity_url = args
            .identity_url
            .ok_or_else(|| miette!("IDENTITY_URL is required outside sandbox mode"))?;
        let verifier = SignatureVerifier::new(&config.key_secret).into_diagnostic()?;
        let identity =
            RemoteIdentityProvider::new(identity_url, config.timeout).into_diagnostic()?;
        (
            Box::new(RazorpayClient::new(config).into_diagnostic()?) as PaymentGatewayBox,
            verifier,
            Arc::new(identity) as Arc<dyn IdentityProvider>,
        )
    };

    let service = ReservationService::new(bookings, rooms, gateway, verifier);
    let app = router(AppState {
        service: Arc::new(service),
        identity,
    });

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .into_diagnostic()?;
    info!(bind = %args.bind, "serving reservation API");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .into_diagnostic()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutting down");
}
