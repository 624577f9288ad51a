use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vault_rag_core::{
    strip_sources, Answer, CharacterNgramEmbedder, ChatTurn, DocumentDescriber, Embedder,
    GeminiConfig, GeminiEmbedder, GeminiGenerator, InMemoryIndex, IngestPipeline,
    IngestionOptions, PineconeConfig, PineconeIndex, QdrantConfig, QdrantIndex,
    RetrievalOrchestrator, RetrievalOptions, SharedHttpClient, TextGenerator, VectorIndex,
};

mod offline;

use offline::MissingGenerator;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum IndexBackend {
    Pinecone,
    Qdrant,
    Memory,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EmbedderBackend {
    Gemini,
    Ngram,
}

#[derive(Parser)]
#[command(name = "vault-rag", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Vector index backend
    #[arg(long, value_enum, default_value = "pinecone")]
    index: IndexBackend,

    /// Embedding backend
    #[arg(long, value_enum, default_value = "gemini")]
    embedder: EmbedderBackend,

    /// Gemini API key used for embeddings, condensation, answers and vision
    #[arg(long, env = "GOOGLE_GENERATIVE_AI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,

    /// Pinecone API key
    #[arg(long, env = "PINECONE_API_KEY", hide_env_values = true)]
    pinecone_api_key: Option<String>,

    /// Pinecone index host, e.g. vault-abc123.svc.us-east-1.pinecone.io
    #[arg(long, env = "PINECONE_INDEX_HOST")]
    pinecone_host: Option<String>,

    /// Qdrant base URL
    #[arg(long, env = "QDRANT_URL", default_value = "http://localhost:6333")]
    qdrant_url: String,

    /// Qdrant collection
    #[arg(long, env = "QDRANT_COLLECTION", default_value = "nexus-ai")]
    qdrant_collection: String,

    /// Timeout for every backend HTTP call, in seconds
    #[arg(long, default_value = "60")]
    timeout_secs: u64,

    /// Skip the vision description of PDFs during ingestion
    #[arg(long, default_value_t = false)]
    no_vision: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest files or folders (pdf, txt, md) into the vault.
    Ingest {
        /// Files or folders to ingest. Folders are walked recursively.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Ask a single question and print the cited answer.
    Ask {
        /// Question to answer
        question: String,
        /// Restrict retrieval to one ingested file name.
        #[arg(long)]
        file: Option<String>,
        /// Print the retrieved excerpts instead of calling generation.
        #[arg(long, default_value_t = false)]
        context_only: bool,
    },
    /// Multi-turn conversation over stdin; follow-up questions are condensed.
    Chat {
        /// Restrict retrieval to one ingested file name.
        #[arg(long)]
        file: Option<String>,
        /// Files or folders to ingest before the conversation starts.
        #[arg(long)]
        ingest: Vec<PathBuf>,
    },
    /// List the file names present in the vault.
    Documents,
}

struct Backends {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    condenser: Arc<dyn TextGenerator>,
    generator: Arc<dyn TextGenerator>,
    describer: Option<Arc<dyn DocumentDescriber>>,
}

async fn build_backends(cli: &Cli) -> anyhow::Result<Backends> {
    let client = SharedHttpClient::with_timeout(Duration::from_secs(cli.timeout_secs));

    let gemini = cli
        .gemini_api_key
        .as_deref()
        .map(GeminiConfig::new)
        .transpose()
        .context("invalid Gemini configuration")?;

    let embedder: Arc<dyn Embedder> = match cli.embedder {
        EmbedderBackend::Gemini => {
            let config = gemini
                .clone()
                .context("GOOGLE_GENERATIVE_AI_API_KEY is not set")?;
            Arc::new(GeminiEmbedder::new(config, client.clone()))
        }
        EmbedderBackend::Ngram => Arc::new(CharacterNgramEmbedder::default()),
    };
    let dimensions = embedder.dimensions();

    let index: Arc<dyn VectorIndex> = match cli.index {
        IndexBackend::Pinecone => {
            let config = PineconeConfig::new(
                cli.pinecone_api_key.clone().unwrap_or_default(),
                cli.pinecone_host.as_deref().unwrap_or_default(),
                dimensions,
            )?;
            Arc::new(PineconeIndex::new(config, client.clone()))
        }
        IndexBackend::Qdrant => {
            let config = QdrantConfig::new(&cli.qdrant_url, &cli.qdrant_collection, dimensions)?;
            let index = QdrantIndex::new(config, client.clone());
            index.ensure_collection().await?;
            Arc::new(index)
        }
        IndexBackend::Memory => Arc::new(InMemoryIndex::new(dimensions)),
    };

    let (condenser, generator, describer): (
        Arc<dyn TextGenerator>,
        Arc<dyn TextGenerator>,
        Option<Arc<dyn DocumentDescriber>>,
    ) = match gemini {
        Some(config) => (
            Arc::new(GeminiGenerator::condensing(config.clone(), client.clone())),
            Arc::new(GeminiGenerator::answering(config.clone(), client.clone())),
            (!cli.no_vision).then(|| {
                Arc::new(GeminiGenerator::vision(config, client.clone()))
                    as Arc<dyn DocumentDescriber>
            }),
        ),
        None => {
            warn!("no Gemini API key; answers are unavailable and follow-ups are not condensed");
            (Arc::new(MissingGenerator), Arc::new(MissingGenerator), None)
        }
    };

    Ok(Backends {
        embedder,
        index,
        condenser,
        generator,
        describer,
    })
}

fn ingest_pipeline(backends: &Backends) -> anyhow::Result<IngestPipeline> {
    let pipeline = IngestPipeline::new(
        backends.embedder.clone(),
        backends.index.clone(),
        IngestionOptions::default(),
    )?;
    Ok(match &backends.describer {
        Some(describer) => pipeline.with_describer(describer.clone()),
        None => pipeline,
    })
}

fn orchestrator(backends: &Backends) -> anyhow::Result<RetrievalOrchestrator> {
    Ok(RetrievalOrchestrator::new(
        backends.embedder.clone(),
        backends.index.clone(),
        backends.condenser.clone(),
        backends.generator.clone(),
        RetrievalOptions::default(),
    )?)
}

async fn ingest_paths(pipeline: &IngestPipeline, paths: &[PathBuf]) -> anyhow::Result<usize> {
    let mut total = 0;

    for path in paths {
        if path.is_dir() {
            let report = pipeline
                .ingest_folder(path)
                .await
                .map_err(|error| anyhow::anyhow!(error.user_message()))?;

            for skipped in &report.skipped_files {
                warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped document");
            }
            for ingested in &report.ingested {
                println!("{}: {} chunks", ingested.file_name, ingested.chunks_count);
                total += ingested.chunks_count;
            }
        } else {
            match ingest_file(pipeline, path).await {
                Ok(count) => total += count,
                Err(message) => println!("{}: {message}", path.display()),
            }
        }
    }

    Ok(total)
}

async fn ingest_file(pipeline: &IngestPipeline, path: &Path) -> Result<usize, String> {
    let report = pipeline
        .ingest_path(path)
        .await
        .map_err(|error| error.user_message())?;
    println!("{}: {} chunks", report.file_name, report.chunks_count);
    Ok(report.chunks_count)
}

fn print_answer(answer: &Answer) {
    let body = strip_sources(&answer.text).unwrap_or_else(|_| answer.text.clone());
    println!("{body}");
    if !answer.sources.is_empty() {
        println!();
        for source in &answer.sources {
            match source.page {
                Some(page) => println!("  source: {} (page {page})", source.file_name),
                None => println!("  source: {}", source.file_name),
            }
        }
    }
    if answer.prompt.used_keyword_fallback {
        info!(
            top_score = answer.prompt.top_score,
            "low vector confidence, excerpts re-ranked by keywords"
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let backends = build_backends(&cli).await?;

    info!(
        version = app_version,
        index = ?cli.index,
        embedder = ?cli.embedder,
        started_at = %Utc::now().to_rfc3339(),
        "vault-rag boot"
    );

    match cli.command {
        Command::Ingest { paths } => {
            let pipeline = ingest_pipeline(&backends)?;
            let total = ingest_paths(&pipeline, &paths).await?;
            println!("{total} chunks ingested at {}", Utc::now().to_rfc3339());
        }
        Command::Ask {
            question,
            file,
            context_only,
        } => {
            let orchestrator = orchestrator(&backends)?;
            let turns = [ChatTurn::user(question)];

            if context_only {
                let prompt = orchestrator
                    .prepare(&turns, file.as_deref())
                    .await
                    .map_err(|error| anyhow::anyhow!(error.user_message()))?;
                println!("query: {}", prompt.search_query);
                println!(
                    "top_score={:.4} keyword_fallback={}",
                    prompt.top_score, prompt.used_keyword_fallback
                );
                println!("{}", prompt.context);
            } else {
                let answer = orchestrator
                    .answer(&turns, file.as_deref())
                    .await
                    .map_err(|error| anyhow::anyhow!(error.user_message()))?;
                print_answer(&answer);
            }
        }
        Command::Chat { file, ingest } => {
            if !ingest.is_empty() {
                let pipeline = ingest_pipeline(&backends)?;
                let total = ingest_paths(&pipeline, &ingest).await?;
                println!("{total} chunks ingested");
            }

            let orchestrator = orchestrator(&backends)?;
            let mut history: Vec<ChatTurn> = Vec::new();
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            let mut stdout = tokio::io::stdout();

            loop {
                stdout.write_all(b"> ").await?;
                stdout.flush().await?;

                let Some(line) = lines.next_line().await? else {
                    break;
                };
                let question = line.trim();
                if question.is_empty() {
                    continue;
                }

                history.push(ChatTurn::user(question));
                match orchestrator.answer(&history, file.as_deref()).await {
                    Ok(answer) => {
                        print_answer(&answer);
                        history.push(ChatTurn::assistant(answer.text));
                    }
                    Err(error) => {
                        history.pop();
                        println!("error: {}", error.user_message());
                    }
                }
            }
        }
        Command::Documents => {
            let orchestrator = orchestrator(&backends)?;
            let names = orchestrator
                .list_documents()
                .await
                .map_err(|error| anyhow::anyhow!(error.user_message()))?;
            if names.is_empty() {
                println!("vault is empty");
            }
            for name in names {
                println!("{name}");
            }
        }
    }

    Ok(())
}
