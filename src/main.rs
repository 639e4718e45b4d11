use std::io::BufRead;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

mod api;
mod auth;
mod config;
mod counseling;
mod error;
mod fallback;
mod gate;
mod models;
mod report;
mod risk;
mod session;
mod students;
mod upload;

use api::ApiClient;
use config::{Config, GlobalArgs};
use fallback::fetch_with_fallback;
use gate::Route;
use models::{NewCounselingSession, RiskLevel};
use session::{FileStorage, SessionStore};
use students::StudentQuery;

#[derive(Parser)]
#[command(name = "edupredict")]
#[command(about = "Student dropout-risk monitoring console", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and persist the session
    Login {
        username: String,
        /// Read from stdin when omitted
        #[arg(long, env = "EDUPREDICT_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Clear the persisted session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List the views available to the current session
    Routes,
    /// Navigate to a route path such as /students/STU002
    Open { path: String },
    /// Risk overview with department breakdown
    Dashboard,
    /// Search, filter and sort students by risk
    Students {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, value_enum)]
        risk: Option<RiskLevel>,
        /// Sort by risk score from low to high
        #[arg(long)]
        asc: bool,
        /// Also write the filtered list as CSV ("-" for stdout)
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Detail view for one student
    Student { id: String },
    /// Raw prediction payload for one student
    Predict { id: String },
    /// Counseling session timeline
    Counseling {
        #[arg(long)]
        student_id: Option<String>,
    },
    /// Record a counseling session
    AddSession {
        #[arg(long)]
        student_id: String,
        #[arg(long)]
        notes: String,
        /// Follow-up date (YYYY-MM-DD)
        #[arg(long)]
        follow_up: Option<chrono::NaiveDate>,
    },
    /// Upload student data for batch risk prediction (admin only)
    Upload {
        file: PathBuf,
        /// Override the MIME type guessed from the file name
        #[arg(long)]
        content_type: Option<String>,
    },
}

struct App {
    config: Config,
    store: SessionStore<FileStorage>,
    api: ApiClient,
}

impl App {
    fn open(config: Config) -> anyhow::Result<Self> {
        let mut store = SessionStore::new(FileStorage::new(&config.home));
        store
            .load()
            .with_context(|| format!("failed to read session from {}", config.home.display()))?;
        let api = ApiClient::new(&config, store.token().map(str::to_string))
            .context("failed to build HTTP client")?;
        Ok(Self { config, store, api })
    }

    /// Applies the route gate. Returns the route to render.
    fn enter(&self, route: Route) -> anyhow::Result<Route> {
        let resolved = gate::resolve(route.clone(), &self.store);
        if resolved == Route::Login && route != Route::Login {
            anyhow::bail!("{route} requires a session; run `edupredict login <username>` first");
        }
        if resolved != route && route != Route::Root {
            eprintln!("{route} is not available to your role; showing {resolved} instead.");
        }
        Ok(resolved)
    }

    async fn render(&self, route: Route, query: &StudentQuery) -> String {
        match route {
            Route::Dashboard => {
                let stats = fetch_with_fallback(
                    "dashboard stats",
                    self.api.dashboard_stats(),
                    fallback::dashboard_stats,
                )
                .await;
                report::render_dashboard(&stats)
            }
            Route::Students => {
                let list =
                    fetch_with_fallback("students", self.api.students(), fallback::students).await;
                report::render_students(&list, query)
            }
            Route::StudentDetail(id) => {
                let student = fetch_with_fallback(
                    "student",
                    async { self.api.student(&id).await.map(Some) },
                    || fallback::find_student(&id),
                )
                .await;
                report::render_student(&student)
            }
            Route::Counseling => report::render_counseling(&counseling::load(&self.api, None).await),
            Route::Upload => "# CSV Upload\nRun `edupredict upload <file.csv>` to submit student data.\n".to_string(),
            Route::Login => "# Login\nRun `edupredict login <username>` to sign in.\n".to_string(),
            Route::NotFound(path) => report::render_not_found(&path),
            Route::Root => report::render_not_found("/"),
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn read_password() -> anyhow::Result<String> {
    eprint!("Password: ");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);
    let config = Config::resolve(&cli.global)?;
    let mut app = App::open(config)?;

    match cli.command {
        Commands::Login { username, password } => {
            let password = match password {
                Some(password) => password,
                None => read_password()?,
            };
            let outcome = auth::login(
                &app.api,
                &mut app.store,
                &username,
                &password,
                app.config.offline_login,
            )
            .await
            .context("login failed")?;
            if outcome.source.is_fallback() {
                println!("Risk service unavailable; signed in offline.");
            }
            println!(
                "Signed in as {} ({}).",
                outcome.session.user.username, outcome.session.user.role
            );
        }
        Commands::Logout => {
            auth::logout(&mut app.store).context("failed to clear session")?;
            println!("Signed out.");
        }
        Commands::Whoami => match app.store.get() {
            Some(session) => println!("{} ({})", session.user.username, session.user.role),
            None if app.store.is_authenticated() => println!("Signed in (unknown user)"),
            None => println!("Not signed in."),
        },
        Commands::Routes => {
            let role = app.store.user().map(|user| user.role);
            let items = if app.store.is_authenticated() {
                gate::nav_items(role)
            } else {
                Vec::new()
            };
            print!("{}", report::render_nav(app.store.user(), &items));
        }
        Commands::Open { path } => {
            let route = app.enter(Route::parse(&path))?;
            print!("{}", app.render(route, &StudentQuery::default()).await);
        }
        Commands::Dashboard => {
            let route = app.enter(Route::Dashboard)?;
            print!("{}", app.render(route, &StudentQuery::default()).await);
        }
        Commands::Students {
            search,
            risk,
            asc,
            csv,
        } => {
            app.enter(Route::Students)?;
            let query = StudentQuery {
                search,
                risk,
                ascending: asc,
            };
            let list =
                fetch_with_fallback("students", app.api.students(), fallback::students).await;
            match csv.as_deref() {
                Some(path) if path.as_os_str() == "-" => {
                    students::export(&list, &query, std::io::stdout().lock(), std::io::stderr())?;
                }
                Some(path) => {
                    let file = std::fs::File::create(path)
                        .with_context(|| format!("failed to create {}", path.display()))?;
                    let written = students::write_csv(&query.apply(&list.data), file)?;
                    print!("{}", report::render_students(&list, &query));
                    println!("Exported {written} students to {}.", path.display());
                }
                None => print!("{}", report::render_students(&list, &query)),
            }
        }
        Commands::Student { id } => {
            let route = app.enter(Route::StudentDetail(id))?;
            print!("{}", app.render(route, &StudentQuery::default()).await);
        }
        Commands::Predict { id } => {
            app.enter(Route::StudentDetail(id.clone()))?;
            let payload = app
                .api
                .predict(&id)
                .await
                .with_context(|| format!("prediction for {id} failed"))?;
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        Commands::Counseling { student_id } => {
            app.enter(Route::Counseling)?;
            let timeline = counseling::load(&app.api, student_id.as_deref()).await;
            print!("{}", report::render_counseling(&timeline));
        }
        Commands::AddSession {
            student_id,
            notes,
            follow_up,
        } => {
            app.enter(Route::Counseling)?;
            let request = NewCounselingSession {
                student_id,
                notes,
                follow_up_date: follow_up.map(|date| date.format("%Y-%m-%d").to_string()),
            };
            let mut timeline = counseling::load(&app.api, None).await;
            let source = counseling::add(&app.api, &mut timeline.data, &request).await;
            if !source.is_fallback() {
                timeline = counseling::load(&app.api, None).await;
            } else {
                timeline.source = source;
            }
            println!("Session added: counseling session has been recorded.");
            println!();
            print!("{}", report::render_counseling(&timeline));
        }
        Commands::Upload { file, content_type } => {
            let route = app.enter(Route::Upload)?;
            if route != Route::Upload {
                print!("{}", app.render(route, &StudentQuery::default()).await);
                return Ok(());
            }
            let prepared = upload::prepare(&file, content_type.as_deref())
                .await
                .with_context(|| format!("cannot upload {}", file.display()))?;
            let name = prepared.name.clone();
            let size_kb = prepared.size_kb();
            let result = upload::submit(&app.api, prepared).await;
            print!("{}", report::render_upload(&name, size_kb, &result));
        }
    }

    Ok(())
}
