use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::WatchStream;
use tracing::{info, warn};

use jornadas_client::{
    ContentNotifier, HttpGateway, LikeStore, LikeView, NotificationState, NotifierConfig, Phase,
    PollingSync, SessionIdentity, ToggleOutcome,
};
use jornadas_common::{DEFAULT_GATEWAY_URL, LIKE_POLL_INTERVAL};
use jornadas_protocol::{DispatchRequest, EntryKind, LikeData, NewEntry};
use jornadas_storage::{DraftStore, FileStore, LocalStore, MapMode, Preferences, TtlCache};

const SUBMIT_FORM: &str = "submit";

#[derive(Parser, Debug)]
#[command(name = "jornadas-cli", about = "Jornadas — cliente de linha de comandos")]
struct Args {
    #[arg(long, env = "JORNADAS_GATEWAY", default_value = DEFAULT_GATEWAY_URL)]
    gateway: String,
    /// Ficheiro do estado local (sessão, linha de base, rascunhos, preferências).
    #[arg(long, env = "JORNADAS_STATE", default_value = ".jornadas/state.json")]
    state: PathBuf,
    #[arg(long, env = "JORNADAS_ADMIN_TOKEN", hide_env_values = true)]
    admin_token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mostra o id de sessão (gera-o na primeira vez).
    Session,
    Likes {
        entry: String,
    },
    Toggle {
        entry: String,
    },
    /// Acompanha os likes de uma entrada até Ctrl-C.
    Watch {
        entry: String,
        #[arg(long, default_value_t = LIKE_POLL_INTERVAL.as_millis() as u64)]
        interval_ms: u64,
    },
    /// Verifica se há conteúdo novo na comunidade.
    News {
        #[arg(long)]
        watch: bool,
    },
    /// Marca o conteúdo atual como visto.
    Seen,
    ResetNews,
    /// Submete uma entrada. O formulário fica em rascunho até ser aceite.
    Submit {
        #[arg(long = "type", value_parser = parse_kind)]
        kind: Option<EntryKind>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        image_url: Option<String>,
        /// Retoma o último rascunho guardado.
        #[arg(long)]
        resume: bool,
    },
    Remove {
        id: String,
    },
    Dispatch {
        event: String,
        /// Payload em JSON.
        #[arg(long)]
        payload: Option<String>,
    },
    Prefs {
        #[arg(long)]
        audio: Option<bool>,
        #[arg(long)]
        location: Option<bool>,
        #[arg(long)]
        map_mode: Option<MapMode>,
    },
}

fn parse_kind(s: &str) -> Result<EntryKind, String> {
    match s.to_lowercase().as_str() {
        "photo" | "foto" => Ok(EntryKind::Photo),
        "testimonial" | "testemunho" => Ok(EntryKind::Testimonial),
        _ => Err(format!("tipo inválido: '{s}'. Use: photo, testimonial")),
    }
}

/// Dependências montadas uma vez e passadas explicitamente.
struct App {
    local: Arc<dyn LocalStore>,
    gateway: Arc<HttpGateway>,
    identity: SessionIdentity,
    likes: LikeStore,
    notifier: ContentNotifier,
    drafts: DraftStore,
}

impl App {
    fn build(args: &Args) -> anyhow::Result<Self> {
        let local: Arc<dyn LocalStore> = Arc::new(
            FileStore::open(&args.state)
                .with_context(|| format!("estado local em {}", args.state.display()))?,
        );

        let mut gateway = HttpGateway::new(&args.gateway)?;
        if let Some(ref token) = args.admin_token {
            gateway = gateway.with_admin_token(token.clone());
        }
        let gateway = Arc::new(gateway);

        Ok(Self {
            identity: SessionIdentity::new(local.clone()),
            likes: LikeStore::new(gateway.clone(), TtlCache::new(None)),
            notifier: ContentNotifier::new(
                gateway.clone(),
                local.clone(),
                NotifierConfig::default(),
            ),
            drafts: DraftStore::new(local.clone()),
            gateway,
            local,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jornadas_cli=info".into()),
        )
        .init();

    let args = Args::parse();
    let app = App::build(&args)?;

    match args.command {
        Command::Session => {
            println!("{}", app.identity.session_id()?);
        }
        Command::Likes { entry } => {
            let session = app.identity.session_id()?;
            let data = app.likes.like_data(&entry, &session).await?;
            println!("{entry}: {}", format_likes(&data));
        }
        Command::Toggle { entry } => {
            let controller = app.likes.controller(entry, app.identity.session_id()?);
            let view = controller.load().await;
            if view.phase != Phase::Ready {
                anyhow::bail!(
                    "likes de {} indisponíveis: {}",
                    controller.entry_id(),
                    view.error.unwrap_or_default()
                );
            }
            match controller.toggle().await {
                ToggleOutcome::Applied(data) => println!("{}", format_likes(&data)),
                ToggleOutcome::RolledBack { restored, error } => {
                    anyhow::bail!("toggle revertido para {}: {error}", format_likes(&restored))
                }
                ToggleOutcome::Ignored => println!("(ignorado)"),
            }
        }
        Command::Watch { entry, interval_ms } => {
            let controller = app.likes.controller(entry.clone(), app.identity.session_id()?);
            let mut views = WatchStream::new(controller.subscribe());
            let sync = PollingSync::mount(controller, Duration::from_millis(interval_ms.max(1)));
            info!("a acompanhar {entry} (Ctrl-C para sair)");

            loop {
                tokio::select! {
                    Some(view) = views.next() => println!("{entry}: {}", format_view(&view)),
                    _ = signal::ctrl_c() => break,
                }
            }
            sync.unmount().await;
        }
        Command::News { watch: false } => {
            let state = app.notifier.check_for_new().await?;
            println!("{}", format_news(&state));
        }
        Command::News { watch: true } => {
            let mut states = WatchStream::new(app.notifier.subscribe());
            let handle = app.notifier.spawn();
            loop {
                tokio::select! {
                    Some(state) = states.next() => println!("{}", format_news(&state)),
                    _ = signal::ctrl_c() => break,
                }
            }
            handle.stop();
        }
        Command::Seen => {
            let state = app.notifier.mark_as_viewed().await?;
            println!("{}", format_news(&state));
        }
        Command::ResetNews => {
            let state = app.notifier.reset()?;
            println!("{}", format_news(&state));
        }
        Command::Submit {
            kind,
            name,
            content,
            image_url,
            resume,
        } => {
            let draft = if resume {
                app.drafts.load::<NewEntry>(SUBMIT_FORM)?
            } else {
                None
            };
            let entry = merge_draft(draft, kind, name, content, image_url)
                .context("faltam --type e --name (ou --resume com um rascunho)")?;

            app.drafts.save(SUBMIT_FORM, &entry)?;
            if let Err(e) = entry.validate() {
                anyhow::bail!("{e} (rascunho guardado, use --resume)");
            }
            match app.gateway.append_entry(&entry).await {
                Ok(created) => {
                    app.drafts.discard(SUBMIT_FORM)?;
                    println!("criada {}", created.id);
                }
                Err(e) => {
                    warn!("submissão falhou, rascunho mantido");
                    return Err(e).context("use --resume para tentar de novo");
                }
            }
        }
        Command::Remove { id } => {
            app.gateway.remove_entry(&id).await?;
            println!("removida {id}");
        }
        Command::Dispatch { event, payload } => {
            let payload = match payload {
                Some(raw) => serde_json::from_str(&raw).context("payload não é JSON")?,
                None => serde_json::Value::Null,
            };
            let ack = app
                .gateway
                .dispatch(&DispatchRequest {
                    event_type: event,
                    payload,
                })
                .await?;
            println!("entregue a {} consumidor(es)", ack.delivered);
        }
        Command::Prefs {
            audio,
            location,
            map_mode,
        } => {
            let mut prefs = Preferences::load(app.local.as_ref());
            let changed = audio.is_some() || location.is_some() || map_mode.is_some();
            if let Some(v) = audio {
                prefs.audio_enabled = v;
            }
            if let Some(v) = location {
                prefs.location_enabled = v;
            }
            if let Some(v) = map_mode {
                prefs.map_mode = v;
            }
            if changed {
                prefs.save(app.local.as_ref())?;
            }
            println!("{}", format_prefs(&prefs));
        }
    }

    Ok(())
}

/// Campos passados na linha de comandos sobrepõem-se ao rascunho.
fn merge_draft(
    draft: Option<NewEntry>,
    kind: Option<EntryKind>,
    name: Option<String>,
    content: Option<String>,
    image_url: Option<String>,
) -> Option<NewEntry> {
    match draft {
        Some(mut entry) => {
            if let Some(kind) = kind {
                entry.kind = kind;
            }
            if let Some(name) = name {
                entry.display_name = name;
            }
            entry.content = content.or(entry.content);
            entry.image_url = image_url.or(entry.image_url);
            Some(entry)
        }
        None => Some(NewEntry {
            kind: kind?,
            display_name: name?,
            content,
            image_url,
        }),
    }
}

fn format_likes(data: &LikeData) -> String {
    if data.liked {
        format!("♥ {} (gostaste)", data.total)
    } else {
        format!("♡ {}", data.total)
    }
}

fn format_view(view: &LikeView) -> String {
    let mut out = match view.phase {
        Phase::Idle | Phase::Loading => "(a carregar)".to_string(),
        Phase::Ready => format_likes(&view.data()),
        Phase::Toggling => format!("{} …", format_likes(&view.data())),
    };
    if let Some(ref error) = view.error {
        out.push_str(&format!(" [erro: {error}]"));
    }
    out
}

fn format_news(state: &NotificationState) -> String {
    let total = state
        .total_count
        .map(|t| format!(" ({t} no total)"))
        .unwrap_or_default();
    if state.has_new_items {
        format!("{} novidade(s){total}", state.new_count)
    } else {
        format!("sem novidades{total}")
    }
}

fn format_prefs(prefs: &Preferences) -> String {
    format!(
        "áudio: {}\nlocalização: {}\nmapa: {}",
        on_off(prefs.audio_enabled),
        on_off(prefs.location_enabled),
        prefs.map_mode
    )
}

fn on_off(v: bool) -> &'static str {
    if v { "ligado" } else { "desligado" }
}
