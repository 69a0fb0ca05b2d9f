//! Interactive classroom session command.

use crate::chat::{ChatModel, OpenAIChatModel};
use crate::cli::Output;
use crate::config::{Prompts, Settings, StoreBackend};
use crate::embedding::OpenAIEmbedder;
use crate::error::{AulaError, Result};
use crate::handlers::{App, RenderAction};
use crate::ingest::UploadedFile;
use crate::session::SessionConfig;
use crate::store::{Rating, RestTurnStore, SqliteTurnStore, TurnStore};
use console::style;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const HELP: &str = "Comandos: /up <id>, /down <id>, /comentario <id> <texto>, \
/quien <nombre>, /csv [ruta], /fin, /salir, /ayuda";

/// Run an interactive classroom session.
pub async fn run_session(
    config: SessionConfig,
    pdfs: &[PathBuf],
    model_override: Option<String>,
    settings: Settings,
) -> Result<()> {
    let store = build_store(&settings)?;
    let embedder = Arc::new(OpenAIEmbedder::with_config(
        &settings.embedding.model,
        settings.embedding.dimensions as usize,
    ));
    let model_id = model_override.unwrap_or_else(|| settings.chat.model.clone());
    let model: Arc<dyn ChatModel> =
        Arc::new(OpenAIChatModel::new(&model_id, settings.chat.temperature));

    let mut app = App::new(
        embedder,
        model,
        store,
        Prompts::default(),
        settings.ingest.clone(),
    );

    let files = read_pdfs(pdfs)?;
    let tema = config.tema.clone();
    let mut author = config
        .estudiantes
        .iter()
        .find(|e| !e.trim().is_empty())
        .cloned()
        .unwrap_or_default();

    let spinner = (!files.is_empty()).then(|| Output::spinner("Indexando PDF..."));
    let configured = app.configure(config, files).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    match configured? {
        RenderAction::SessionReady { indexed_chunks } if indexed_chunks > 0 => {
            Output::success(&format!("Materiales indexados ({} fragmentos)", indexed_chunks));
        }
        _ => {}
    }

    println!("\n{}", style(format!("Asistente: {}", tema)).bold().cyan());
    Output::kv("ID de sesión", app.session.id());
    Output::kv("Escribe ahora", &author);
    println!("{}\n", style(HELP).dim());

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style(format!("{}:", author)).green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(command) = input.strip_prefix('/') {
            if !handle_command(&mut app, command, &mut author).await? {
                break;
            }
        } else {
            send(&mut app, &author, input).await;
        }

        for notice in app.session.notices.drain(..) {
            Output::notice(&notice);
        }
    }

    Ok(())
}

/// Dispatch one slash command. Returns false when the loop should end.
async fn handle_command(app: &mut App, command: &str, author: &mut String) -> Result<bool> {
    let (name, rest) = command.split_once(' ').unwrap_or((command, ""));
    let rest = rest.trim();

    let result = match name {
        "salir" => return Ok(false),
        "ayuda" => {
            Output::info(HELP);
            return Ok(true);
        }
        "fin" => {
            app.finalize();
            Output::info("Sesión finalizada. Puedes seguir usando /csv y feedback.");
            return Ok(true);
        }
        "quien" => {
            if app.session.has_participant(rest) {
                *author = rest.to_string();
                Output::info(&format!("Ahora escribe {}", author));
            } else {
                Output::error(&format!("{} no es integrante de esta sesión.", rest));
            }
            return Ok(true);
        }
        "csv" => app.export_csv().and_then(|action| {
            if let RenderAction::CsvReady { filename, bytes } = action {
                let path = if rest.is_empty() { filename } else { rest.to_string() };
                std::fs::write(&path, bytes)?;
                Output::success(&format!("Respaldo guardado en {}", path));
            }
            Ok(RenderAction::Nothing)
        }),
        "up" | "down" => {
            let rating = if name == "up" { Rating::Up } else { Rating::Down };
            match rest.parse::<i64>() {
                Ok(id) => app.rate_turn(id, rating).await,
                Err(_) => Err(AulaError::InvalidInput(format!("Uso: /{} <id>", name))),
            }
        }
        "comentario" => {
            let (id, text) = rest.split_once(' ').unwrap_or((rest, ""));
            match id.parse::<i64>() {
                Ok(id) => app.comment_turn(id, text).await,
                Err(_) => Err(AulaError::InvalidInput(
                    "Uso: /comentario <id> <texto>".to_string(),
                )),
            }
        }
        _ => Err(AulaError::InvalidInput(format!("Comando desconocido: /{}", name))),
    };

    match result {
        Ok(RenderAction::RatingConfirmed(Rating::Up)) => {
            Output::success("¡Gracias! Feedback positivo registrado.");
        }
        Ok(RenderAction::RatingConfirmed(Rating::Down)) => {
            Output::info("Feedback registrado. ¿Cómo podemos mejorar? /comentario <id> <texto>");
        }
        Ok(RenderAction::CommentConfirmed) => {
            Output::success("Comentario guardado. ¡Gracias!");
        }
        Ok(_) => {}
        Err(e) => Output::error(&e.to_string()),
    }

    Ok(true)
}

/// Send one message, showing the busy indicator during the model call.
async fn send(app: &mut App, author: &str, text: &str) {
    let spinner = Output::spinner("El asistente está pensando su respuesta...");
    let action = app.send_message(author, text).await;
    spinner.finish_and_clear();

    match action {
        Ok(RenderAction::Exchange { reply, turn_id, .. }) => {
            println!("\n{} {}\n", style("Asistente:").cyan().bold(), reply);
            if let Some(id) = turn_id {
                println!("{}", style(format!("   (id {id}: /up {id} o /down {id})")).dim());
            }
        }
        Ok(_) => {}
        Err(e) => Output::error(&e.to_string()),
    }
}

fn build_store(settings: &Settings) -> Result<Arc<dyn TurnStore>> {
    match settings.store.backend {
        StoreBackend::Rest => {
            let url = settings.store.supabase_url.as_deref().ok_or_else(|| {
                AulaError::Config("Credenciales de Supabase no configuradas.".to_string())
            })?;
            let key = settings.store.supabase_key.as_deref().ok_or_else(|| {
                AulaError::Config("Credenciales de Supabase no configuradas.".to_string())
            })?;
            Ok(Arc::new(RestTurnStore::new(url, key, &settings.store.table)?))
        }
        StoreBackend::Sqlite => Ok(Arc::new(SqliteTurnStore::new(&settings.sqlite_path())?)),
    }
}

fn read_pdfs(paths: &[PathBuf]) -> Result<Vec<UploadedFile>> {
    paths
        .iter()
        .map(|path| {
            let bytes = std::fs::read(path)?;
            let name = Path::new(path)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("material.pdf")
                .to_string();
            Ok(UploadedFile::new(name, bytes))
        })
        .collect()
}
