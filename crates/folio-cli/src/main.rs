//! # folio: command-line client for the FOLIO hub
//!
//! - `folio query books --q martin --sort-by year`: search a collection.
//! - `folio bulk-send --filter role=viewer --subject ... --text ...`: batched mail.
//! - `folio seed all`: load the demo books and users.

use clap::{Parser, Subcommand, ValueEnum};
use folio_core::{QueryParams, QueryResult, Record};
use serde_json::{json, Value};
use tabled::builder::Builder;
use tabled::settings::Style;

/// 📚 FOLIO: search collections, send mail and score questionnaires.
#[derive(Parser)]
#[command(name = "folio", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report hub status as JSON.
    Status,

    /// Search, filter, sort and page a collection.
    Query {
        collection: String,
        #[command(flatten)]
        search: SearchArgs,
        #[arg(long)]
        sort_by: Option<String>,
        /// asc or desc.
        #[arg(long)]
        sort_dir: Option<String>,
        #[arg(long)]
        page: Option<String>,
        #[arg(long)]
        page_size: Option<String>,
        /// Return nothing unless a term or filter is given.
        #[arg(long)]
        require_search: bool,
        /// Print the raw JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Count the records in a collection.
    Count {
        #[arg(default_value = "books")]
        collection: String,
    },

    /// Send one message to every address on a shared envelope.
    Send {
        /// Comma-separated addresses.
        #[arg(long)]
        to: String,
        #[command(flatten)]
        message: MessageArgs,
    },

    /// Send one message per recipient, in batches.
    BulkSend {
        /// Comma-separated addresses; otherwise recipients come from the search.
        #[arg(long, conflicts_with_all = ["q", "filter"])]
        to: Option<String>,
        #[command(flatten)]
        search: SearchArgs,
        #[command(flatten)]
        message: MessageArgs,
    },

    /// Upsert the demo fixtures.
    Seed {
        #[arg(value_enum)]
        what: SeedTarget,
    },

    /// Score the wellbeing questionnaire.
    Questionnaire {
        #[arg(long)]
        sleep_hours: f64,
        #[arg(long)]
        stress_level: f64,
        #[arg(long)]
        exercise_frequency: f64,
        #[arg(long)]
        diet_quality: f64,
    },

    /// Look up places by name.
    Geocode {
        q: String,
        #[arg(long)]
        limit: Option<u32>,
        /// lng,lat to bias results toward.
        #[arg(long)]
        proximity: Option<String>,
    },

    /// Directions between two lng,lat points.
    Route {
        from: String,
        to: String,
        /// walking, driving or cycling.
        #[arg(long, default_value = "walking")]
        profile: String,
    },
}

#[derive(clap::Args)]
struct SearchArgs {
    /// Free-text term.
    #[arg(long)]
    q: Option<String>,
    /// Field filter as field=value (repeatable).
    #[arg(long, value_parser = parse_filter)]
    filter: Vec<(String, String)>,
}

impl SearchArgs {
    fn params(&self) -> QueryParams {
        let mut params = QueryParams {
            q: self.q.clone(),
            ..Default::default()
        };
        for (field, value) in &self.filter {
            params = params.with_filter(field, value);
        }
        params
    }
}

#[derive(clap::Args)]
struct MessageArgs {
    #[arg(long)]
    subject: String,
    #[arg(long)]
    text: Option<String>,
    #[arg(long)]
    html: Option<String>,
}

impl MessageArgs {
    fn to_json(&self) -> Value {
        json!({ "subject": self.subject, "text": self.text, "html": self.html })
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SeedTarget {
    Books,
    Users,
    All,
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((field, value)) if !field.trim().is_empty() => {
            Ok((field.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected field=value, got '{raw}'")),
    }
}

fn main() {
    let cli = Cli::parse();

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to build tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(async_main(cli.command)) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn async_main(cmd: Commands) -> Result<(), String> {
    let client = reqwest::Client::new();
    let base_url =
        std::env::var("FOLIO_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:5007".to_string());

    match cmd {
        Commands::Status => {
            let json = get_request(&client, &format!("{}/status", base_url), &[]).await?;
            print_json(&json);
        }

        Commands::Query {
            collection,
            search,
            sort_by,
            sort_dir,
            page,
            page_size,
            require_search,
            json,
        } => {
            let params = QueryParams {
                sort_by,
                sort_dir,
                page,
                page_size,
                require_search,
                ..search.params()
            };
            let url = format!("{}/api/{}", base_url, collection);
            let body = get_request(&client, &url, &params.to_pairs()).await?;
            if json {
                print_json(&body);
            } else {
                let result: QueryResult =
                    serde_json::from_value(body).map_err(|e| format!("unexpected response: {e}"))?;
                println!("{}", render_table(&result.items));
                println!(
                    "page {}/{} · {} of {} matching",
                    result.page,
                    result.page_count().max(1),
                    result.items.len(),
                    result.total
                );
            }
        }

        Commands::Count { collection } => {
            let url = format!("{}/api/{}/count", base_url, collection);
            let json = get_request(&client, &url, &[]).await?;
            println!("{}", json["count"]);
        }

        Commands::Send { to, message } => {
            let mut payload = message.to_json();
            payload["to"] = json!(to);
            let json = post_request(&client, &format!("{}/sendEmail", base_url), &payload).await?;
            print_json(&json);
        }

        Commands::BulkSend {
            to,
            search,
            message,
        } => {
            let mut payload = message.to_json();
            match to {
                Some(to) => payload["to"] = json!(to),
                None => payload["search"] = json!(search.params()),
            }
            let url = format!("{}/sendBulkEmail", base_url);
            let json = post_request(&client, &url, &payload).await?;
            print_json(&json);
        }

        Commands::Seed { what } => {
            let path = match what {
                SeedTarget::Books => "seedBooks",
                SeedTarget::Users => "seedUsers",
                SeedTarget::All => "seedAll",
            };
            let url = format!("{}/{}", base_url, path);
            let json = post_request(&client, &url, &json!({})).await?;
            print_json(&json);
        }

        Commands::Questionnaire {
            sleep_hours,
            stress_level,
            exercise_frequency,
            diet_quality,
        } => {
            let payload = json!({
                "sleep_hours": sleep_hours,
                "stress_level": stress_level,
                "exercise_frequency": exercise_frequency,
                "diet_quality": diet_quality,
            });
            let url = format!("{}/questionnaire", base_url);
            let json = post_request(&client, &url, &payload).await?;
            println!("{}", json["category"].as_str().unwrap_or("?"));
            for tip in json["recommendations"].as_array().into_iter().flatten() {
                println!("  - {}", tip.as_str().unwrap_or_default());
            }
        }

        Commands::Geocode {
            q,
            limit,
            proximity,
        } => {
            let mut query = vec![("q".to_string(), q)];
            if let Some(limit) = limit {
                query.push(("limit".to_string(), limit.to_string()));
            }
            if let Some(proximity) = proximity {
                query.push(("proximity".to_string(), proximity));
            }
            let url = format!("{}/map/geocode", base_url);
            let json = get_request(&client, &url, &query).await?;
            print_json(&json);
        }

        Commands::Route { from, to, profile } => {
            let query = [
                ("from".to_string(), from),
                ("to".to_string(), to),
                ("profile".to_string(), profile),
            ];
            let url = format!("{}/map/route", base_url);
            let json = get_request(&client, &url, &query).await?;
            print_json(&json);
        }
    }

    Ok(())
}

fn print_json(json: &Value) {
    match serde_json::to_string_pretty(json) {
        Ok(text) => println!("{}", text),
        Err(_) => println!("{}", json),
    }
}

/// `id` first, then every field seen across `records` in first-seen order.
fn render_table(records: &[Record]) -> String {
    let mut columns: Vec<&str> = vec!["id"];
    for record in records {
        for field in record.fields.keys() {
            if !columns.contains(&field.as_str()) {
                columns.push(field);
            }
        }
    }

    let mut builder = Builder::default();
    builder.push_record(columns.iter().map(|c| c.to_string()));
    for record in records {
        builder.push_record(
            columns
                .iter()
                .map(|column| record.value(column).as_text().into_owned()),
        );
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

/// Response body as JSON; non-2xx responses become the hub's error message.
async fn read_response(resp: reqwest::Response) -> Result<Value, String> {
    let status = resp.status();
    let json: Value = resp
        .json()
        .await
        .map_err(|e| format!("HTTP {}: {}", status, e))?;
    if status.is_success() {
        Ok(json)
    } else {
        let message = json["error"].as_str().unwrap_or("request failed");
        Err(format!("HTTP {}: {}", status, message))
    }
}

async fn get_request(
    client: &reqwest::Client,
    url: &str,
    query: &[(String, String)],
) -> Result<Value, String> {
    let resp = client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| e.to_string())?;
    read_response(resp).await
}

async fn post_request(
    client: &reqwest::Client,
    url: &str,
    json: &Value,
) -> Result<Value, String> {
    let resp = client
        .post(url)
        .json(json)
        .send()
        .await
        .map_err(|e| e.to_string())?;
    read_response(resp).await
}
