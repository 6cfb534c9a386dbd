use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use inventory::{
    BoxEvent, BoxProductEvent, ControllerEvent, EventBus, Inventory, PalletEvent, ProductEvent,
    TaggedEvent,
};
use serde::Serialize;
use shared::domain::{BoxProductLine, RecordDetails};

mod config;

use config::{load_settings, normalize_database_url, DEFAULT_CONFIG_FILE};

#[derive(Parser, Debug)]
#[command(name = "pallets", about = "Track warehouse pallets, their boxes and the products inside")]
struct Cli {
    /// Overrides the database URL from settings and environment.
    #[arg(long)]
    database_url: Option<String>,
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Print controller events as JSON lines.
    #[arg(long)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(subcommand)]
    Pallet(PalletCommand),
    #[command(subcommand, name = "box")]
    Boxes(BoxCommand),
    #[command(subcommand)]
    Product(ProductCommand),
    #[command(subcommand)]
    BoxProduct(BoxProductCommand),
}

#[derive(Subcommand, Debug)]
enum PalletCommand {
    Add,
    List,
    Show { code: String },
    Finish { code: String },
}

#[derive(Subcommand, Debug)]
enum BoxCommand {
    /// Adds the next box to a pallet.
    Add { pallet: String },
    List { pallet: String },
    Show { code: String },
    Finish { code: String },
}

#[derive(Subcommand, Debug)]
enum ProductCommand {
    Add { name: String, ean: String },
    List,
}

#[derive(Subcommand, Debug)]
enum BoxProductCommand {
    Add {
        #[arg(value_name = "BOX")]
        box_code: String,
        ean: String,
        #[arg(long)]
        quantity: Option<u32>,
    },
    List {
        #[arg(value_name = "BOX")]
        box_code: String,
    },
}

impl Command {
    fn shows_details(&self) -> bool {
        matches!(
            self,
            Command::Pallet(PalletCommand::Show { .. }) | Command::Boxes(BoxCommand::Show { .. })
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings(&cli.config)?;
    if let Some(url) = &cli.database_url {
        settings.database_url = url.clone();
    }

    tracing_subscriber::fmt()
        .with_env_filter(settings.log_filter.as_str())
        .with_writer(std::io::stderr)
        .init();

    let database_url = normalize_database_url(&settings.database_url);
    tracing::debug!(%database_url, "opening inventory database");
    let mut inventory = Inventory::open(&database_url, settings.display_options()).await?;

    let mut tags = vec![
        ControllerEvent::Added,
        ControllerEvent::Listed,
        ControllerEvent::Finished,
    ];
    if cli.command.shows_details() {
        tags.push(ControllerEvent::DetailsLoaded);
    }
    let json = cli.json;
    print_events(inventory.pallets.events(), &tags, json, render_pallet);
    print_events(inventory.boxes.events(), &tags, json, render_box);
    print_events(inventory.products.events(), &tags, json, render_product);
    print_events(inventory.box_products.events(), &tags, json, render_box_product);

    match cli.command {
        Command::Pallet(cmd) => match cmd {
            PalletCommand::Add => {
                inventory.add_pallet().await?;
            }
            PalletCommand::List => {
                inventory.list_pallets().await?;
            }
            PalletCommand::Show { code } => {
                inventory.open_pallet(&code).await?;
            }
            PalletCommand::Finish { code } => {
                inventory.open_pallet(&code).await?;
                inventory.finish_pallet().await?;
            }
        },
        Command::Boxes(cmd) => match cmd {
            BoxCommand::Add { pallet } => {
                inventory.open_pallet(&pallet).await?;
                inventory.add_box().await?;
            }
            BoxCommand::List { pallet } => {
                inventory.open_pallet(&pallet).await?;
                inventory.list_boxes().await?;
            }
            BoxCommand::Show { code } => {
                inventory.open_box(&code).await?;
            }
            BoxCommand::Finish { code } => {
                inventory.open_box(&code).await?;
                inventory.finish_box().await?;
            }
        },
        Command::Product(cmd) => match cmd {
            ProductCommand::Add { name, ean } => {
                inventory.add_product(&name, &ean).await?;
            }
            ProductCommand::List => {
                inventory.list_products().await?;
            }
        },
        Command::BoxProduct(cmd) => match cmd {
            BoxProductCommand::Add {
                box_code,
                ean,
                quantity,
            } => {
                inventory.open_box(&box_code).await?;
                inventory.add_product_to_box(&ean, quantity).await?;
            }
            BoxProductCommand::List { box_code } => {
                inventory.open_box(&box_code).await?;
                inventory.list_box_products().await?;
            }
        },
    }

    Ok(())
}

/// Subscribes a printer for `tags`; plays the part of the list screens.
fn print_events<E>(bus: &EventBus<E>, tags: &[ControllerEvent], json: bool, render: fn(&E) -> String)
where
    E: TaggedEvent + Serialize + 'static,
{
    for &tag in tags {
        bus.listen_fn(tag, move |event: &E| {
            if json {
                println!("{}", serde_json::to_string(event)?);
            } else {
                println!("{}", render(event));
            }
            Ok(())
        });
    }
}

fn render_details(label: &str, details: &RecordDetails) -> String {
    format!(
        "{label} {}\n  created:  {}\n  finished: {}",
        details.code, details.created_at, details.finished_at
    )
}

fn render_codes<'a>(empty: &str, codes: impl Iterator<Item = &'a str>) -> String {
    let lines: Vec<&str> = codes.collect();
    if lines.is_empty() {
        empty.to_string()
    } else {
        lines.join("\n")
    }
}

fn render_pallet(event: &PalletEvent) -> String {
    match event {
        PalletEvent::Added(pallet) => format!("created pallet {}", pallet.code),
        PalletEvent::Listed(pallets) => {
            render_codes("no pallets", pallets.iter().map(|p| p.code.as_str()))
        }
        PalletEvent::DetailsLoaded(details) => render_details("pallet", details),
        PalletEvent::Finished(details) => {
            format!("finished pallet {} on {}", details.code, details.finished_at)
        }
    }
}

fn render_box(event: &BoxEvent) -> String {
    match event {
        BoxEvent::Added(created) => format!("created box {}", created.code),
        BoxEvent::Listed { boxes, .. } => {
            render_codes("no boxes", boxes.iter().map(|b| b.code.as_str()))
        }
        BoxEvent::DetailsLoaded(details) => render_details("box", details),
        BoxEvent::Finished(details) => {
            format!("finished box {} on {}", details.code, details.finished_at)
        }
    }
}

fn render_product(event: &ProductEvent) -> String {
    match event {
        ProductEvent::Added(product) => {
            format!("registered product {} ({})", product.name, product.ean)
        }
        ProductEvent::Listed(products) if products.is_empty() => "no products".to_string(),
        ProductEvent::Listed(products) => products
            .iter()
            .map(|p| format!("{}\t{}", p.ean, p.name))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn render_line(line: &BoxProductLine) -> String {
    format!(
        "{} x {}\t{}",
        line.quantity, line.product.ean, line.product.name
    )
}

fn render_box_product(event: &BoxProductEvent) -> String {
    match event {
        BoxProductEvent::Added(line) => format!("added {}", render_line(line)),
        BoxProductEvent::Listed { lines, .. } if lines.is_empty() => "box is empty".to_string(),
        BoxProductEvent::Listed { lines, .. } => lines
            .iter()
            .map(render_line)
            .collect::<Vec<_>>()
            .join("\n"),
    }
}
