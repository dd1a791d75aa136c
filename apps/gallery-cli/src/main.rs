use std::io::{BufRead, Write};
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use client_sdk::{
    ClientConfig, DEFAULT_SERVER_URL, DeleteOutcome, GalleryClient, SaveOutcome, SettingsSync,
};
use common::{AppDraft, SaveMode};
use gallery_core::{CategoryFilter, CategoryOutcome, CategoryPanel, SettingsView, SortKey};
use tracing_subscriber::EnvFilter;

mod web;

#[derive(Debug, Parser)]
#[command(name = "app-gallery")]
#[command(about = "Command-line and web front end for the app gallery API")]
struct Cli {
    #[arg(long, env = "APP_GALLERY_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    server_url: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List apps, optionally filtered and sorted.
    List {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        sort: Option<SortKey>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    Show {
        id: String,
    },
    Add {
        #[command(flatten)]
        fields: AppFields,
    },
    Edit {
        id: String,
        #[command(flatten)]
        fields: AppFields,
    },
    Delete {
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long, short = 'y', default_value_t = false)]
        yes: bool,
    },
    /// Record a launch and print the shortcut URL to open.
    Launch {
        id: String,
        #[arg(long)]
        template: Option<String>,
    },
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
    Categories {
        #[command(subcommand)]
        command: CategoryCommand,
    },
    Import {
        file: PathBuf,
    },
    Export {
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, default_value_t = false)]
        stdout: bool,
    },
    /// Rewrite every stored entry into the current field layout.
    Repair,
    SearchUrl {
        name: String,
    },
    ServeWeb {
        #[arg(long, default_value = "127.0.0.1:8081")]
        bind: String,
    },
}

#[derive(Debug, Subcommand)]
enum SettingsCommand {
    Show,
    IconSize { px: u32 },
    ShortcutUrl { url: String },
    Reset,
}

#[derive(Debug, Subcommand)]
enum CategoryCommand {
    List,
    Add { name: String },
}

#[derive(Debug, Args)]
struct AppFields {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    category: Option<String>,
    /// Ensure this category exists and assign it.
    #[arg(long)]
    new_category: Option<String>,
    #[arg(long)]
    icon_url: Option<String>,
    #[arg(long)]
    app_store_link: Option<String>,
}

impl AppFields {
    fn apply_to(self, draft: &mut AppDraft) {
        if let Some(name) = self.name {
            draft.name = name;
        }
        if let Some(category) = self.category {
            draft.category = category;
        }
        if let Some(icon_url) = self.icon_url {
            draft.icon_url = icon_url;
        }
        if let Some(app_store_link) = self.app_store_link {
            draft.app_store_link = app_store_link;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let client = GalleryClient::with_config(ClientConfig {
        server_url: cli.server_url.clone(),
        ..ClientConfig::from_env()
    });

    match cli.command {
        Commands::List {
            category,
            sort,
            json,
        } => {
            let apps = client.list_apps().await?;
            let visible =
                gallery_core::arrange(&apps, &CategoryFilter::new(category.as_deref()), sort);
            if json {
                println!("{}", serde_json::to_string_pretty(&visible)?);
            } else {
                for app in &visible {
                    println!(
                        "{}\t{}\t{}\t{}",
                        app.id, app.name, app.category, app.launch_count
                    );
                }
            }
        }
        Commands::Show { id } => {
            let app = client.get_app(&id).await?;
            println!("{}", serde_json::to_string_pretty(&app)?);
            println!("{}", gallery_core::launch_summary(&app));
        }
        Commands::Add { mut fields } => {
            let new_category = fields.new_category.take();
            let mut draft = AppDraft::default();
            fields.apply_to(&mut draft);
            let outcome = submit(&client, draft, new_category.as_deref()).await?;
            report_save(&outcome);
        }
        Commands::Edit { id, mut fields } => {
            let existing = client
                .get_app(&id)
                .await
                .with_context(|| format!("cannot edit app {id}"))?;
            let new_category = fields.new_category.take();
            let mut draft = AppDraft::from(&existing);
            fields.apply_to(&mut draft);
            let outcome = submit(&client, draft, new_category.as_deref()).await?;
            report_save(&outcome);
        }
        Commands::Delete { id, yes } => {
            let mut confirm = |prompt: &str| yes || prompt_yes_no(prompt);
            match client.delete_app_confirmed(&id, &mut confirm).await? {
                DeleteOutcome::Deleted => println!("deleted {id}"),
                DeleteOutcome::Cancelled => println!("delete cancelled"),
            }
        }
        Commands::Launch { id, template } => {
            let app = client
                .get_app(&id)
                .await
                .with_context(|| format!("cannot launch app {id}"))?;
            let template = match template {
                Some(template) => template,
                None => SettingsSync::new(client.clone()).load().await.shortcut_url,
            };
            let outcome = client.launch(&app.id, &app.name, &template).await;
            if let Some(count) = outcome.launch_count {
                eprintln!("launched {} ({count} times)", app.name);
            }
            println!("{}", outcome.url);
        }
        Commands::Settings { command } => run_settings(&client, command).await?,
        Commands::Categories { command } => match command {
            CategoryCommand::List => {
                for category in client.list_categories().await? {
                    println!("{category}");
                }
            }
            CategoryCommand::Add { name } => match client.add_category(&name).await? {
                CategoryOutcome::Exists(category) => println!("category exists: {category}"),
                CategoryOutcome::Created(category) => println!("added category: {category}"),
            },
        },
        Commands::Import { file } => {
            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let summary = client.import_text(&text).await?;
            println!(
                "Successfully imported {} apps and updated {} apps.",
                summary.imported, summary.updated
            );
        }
        Commands::Export { output, stdout } => {
            let now = Utc::now();
            let document = client.export(now).await?;
            let text = document.to_pretty_json()?;
            if stdout {
                println!("{text}");
            } else {
                let path = output.unwrap_or_else(|| {
                    PathBuf::from(gallery_core::export_file_name(now.date_naive()))
                });
                tokio::fs::write(&path, text)
                    .await
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("exported {} apps to {}", document.apps.len(), path.display());
            }
        }
        Commands::Repair => {
            let summary = client.repair(Utc::now()).await?;
            println!(
                "repaired collection: {} imported, {} updated",
                summary.imported, summary.updated
            );
        }
        Commands::SearchUrl { name } => match gallery_core::app_store_search_url(&name) {
            Some(url) => println!("{url}"),
            None => bail!("app name must not be empty"),
        },
        Commands::ServeWeb { bind } => {
            let bind_addr: SocketAddr = bind
                .parse()
                .with_context(|| format!("invalid bind address {bind}"))?;
            web::serve(client, bind_addr).await?;
        }
    }

    Ok(())
}

async fn submit(
    client: &GalleryClient,
    draft: AppDraft,
    new_category: Option<&str>,
) -> Result<SaveOutcome> {
    let mut panel = CategoryPanel::default();
    let outcome = client
        .submit_app_form(draft, new_category, &mut panel)
        .await?;
    Ok(outcome)
}

fn report_save(outcome: &SaveOutcome) {
    let verb = match outcome.mode {
        SaveMode::Create => "created",
        SaveMode::Update => "updated",
    };
    match &outcome.app {
        Some(app) => println!("{verb} {} ({})", app.name, app.id),
        None => println!("{verb} app"),
    }
}

async fn run_settings(client: &GalleryClient, command: SettingsCommand) -> Result<()> {
    let sync = SettingsSync::new(client.clone());
    match command {
        SettingsCommand::Show => print_settings(&sync.load().await),
        SettingsCommand::IconSize { px } => {
            sync.load().await;
            print_settings(&sync.change_icon_size(px).await);
        }
        SettingsCommand::ShortcutUrl { url } => {
            sync.load().await;
            let view = sync.change_shortcut_url(url).await;
            sync.flush().await;
            print_settings(&view);
        }
        SettingsCommand::Reset => print_settings(&sync.reset().await?),
    }
    Ok(())
}

fn print_settings(view: &SettingsView) {
    let layout = view.layout();
    println!("icon size:    {}px", view.icon_size.px());
    println!("columns:      {}", layout.columns());
    println!("shortcut url: {}", view.shortcut_url);
}

fn prompt_yes_no(prompt: &str) -> bool {
    eprint!("{prompt} [y/N] ");
    let _ = std::io::stderr().flush();

    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
