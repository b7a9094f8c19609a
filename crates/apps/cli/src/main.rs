use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use remote::{GatewayConfig, HttpGateway};
use runtime::{FeatureController, SessionConfig};
use scene::EntityId;
use tracing::error;
use tracing_subscriber::EnvFilter;

mod stdin_prompt;

use stdin_prompt::StdinPrompt;

#[derive(Parser, Debug)]
#[command(author, version, about = "Manage named shapes stored in the point service")]
struct Args {
    /// Service root (overrides ATLAS_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Per-call timeout in milliseconds (overrides ATLAS_TIMEOUT_MS)
    #[arg(long)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List stored shapes
    List,

    /// Show one stored shape
    Show { id: i64 },

    /// Store a shape given in longitude/latitude WKT
    Create {
        #[arg(long)]
        name: String,

        /// e.g. "POINT(32.8541 39.9208)"
        #[arg(long)]
        wkt: String,
    },

    /// Change name and geometry of a shape; prompts for both unless given
    Update {
        id: i64,

        #[arg(long, requires = "wkt")]
        name: Option<String>,

        /// Longitude/latitude WKT
        #[arg(long, requires = "name")]
        wkt: Option<String>,
    },

    /// Delete a shape
    Delete {
        id: i64,

        /// Skip the confirmation question
        #[arg(long)]
        yes: bool,
    },

    /// Finish a drawing given in display (Web Mercator metre) WKT, asking for its name
    Draw {
        #[arg(long)]
        wkt: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut config = GatewayConfig::from_env();
    if let Some(api_url) = args.api_url {
        config = config.with_base_url(api_url);
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config = config.with_timeout(Duration::from_millis(timeout_ms));
    }

    let session_config = SessionConfig::from_gateway(&config);
    let gateway = Arc::new(HttpGateway::new(config)?);
    let controller = FeatureController::new(gateway, session_config);

    let result = run(&controller, args.command).await;
    for event in controller.events().lock().drain() {
        println!("{}", event.message);
    }
    if let Err(err) = &result {
        error!(error = %err, "command failed");
    }
    result
}

async fn run(
    controller: &FeatureController,
    command: Command,
) -> Result<(), Box<dyn std::error::Error>> {
    let prompt = StdinPrompt;
    match command {
        Command::List => {
            controller.load().await?;
            let index = controller.index().read();
            for entity in index.sorted() {
                let id = entity.id.map(|id| id.to_string()).unwrap_or_default();
                let name = if entity.name.is_empty() {
                    "Unnamed"
                } else {
                    entity.name.as_str()
                };
                println!("{id}\t{name}\t{}", formats::serialize(&entity.geometry));
            }
        }
        Command::Show { id } => {
            let detail = controller.read(EntityId(id)).await?;
            println!("{}", detail.name.as_deref().unwrap_or("Unnamed"));
            if let Some(kind) = &detail.kind {
                println!("Type: {kind}");
            }
            println!("WKT: {}", formats::serialize(&detail.geometry));
            match detail.geometry.to_display(&controller.config().projection) {
                Ok(display) => println!("Display: {}", formats::serialize(&display)),
                Err(err) => println!("Display: unavailable ({err})"),
            }
        }
        Command::Create { name, wkt } => {
            let entity = controller.create(&name, &wkt).await?;
            if let Some(id) = entity.id {
                println!("{id}");
            }
        }
        Command::Update { id, name, wkt } => match (name, wkt) {
            (Some(name), Some(wkt)) => {
                controller.update(EntityId(id), &name, &wkt).await?;
            }
            _ => {
                controller.edit_with_prompt(EntityId(id), &prompt).await?;
            }
        },
        Command::Delete { id, yes } => {
            if yes {
                controller.delete(EntityId(id)).await?;
            } else if !controller
                .delete_with_confirmation(EntityId(id), &prompt)
                .await?
            {
                println!("Nothing deleted.");
            }
        }
        Command::Draw { wkt } => {
            let drawn = formats::parse(&wkt)?;
            let session = controller.session();
            session.start_draw(drawn.kind())?;
            session.on_geometry_complete(drawn)?;
            if session.run_naming(&prompt).await?.is_none() {
                println!("Drawing discarded.");
            }
        }
    }
    Ok(())
}
