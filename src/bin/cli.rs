use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

use batchsave_lib::config::{self, Defaults};
use batchsave_lib::node::{self, UiResponse};
use batchsave_lib::{BatchImageSaver, ImageTensor};

#[derive(Parser)]
#[command(
    name = "batchsave",
    about = "Salva lotes de imagens com nomes e pastas gerados por template"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Imagens de entrada (formam um único lote)
    images: Vec<PathBuf>,

    /// Template do nome do arquivo (%date, %time, %model, %seed, %counter)
    #[arg(short, long)]
    filename: Option<String>,

    /// Template da subpasta dentro do diretório de saída
    #[arg(short, long)]
    path: Option<String>,

    /// Extensão de saída: png, jpeg ou webp
    #[arg(short, long)]
    extension: Option<String>,

    /// JSON com o grafo do prompt
    #[arg(long)]
    prompt: Option<PathBuf>,

    /// JSON com as informações extras do workflow
    #[arg(long)]
    extra: Option<PathBuf>,

    /// Diretório de saída (default: do batchsave.toml, ou ./output)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Diretório de configuração (default: ./config)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log em nível debug
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Executar vários salvamentos a partir de um arquivo de jobs (.toml)
    Batch {
        /// Caminho do arquivo de jobs
        jobs: PathBuf,
    },
    /// Imprimir o registro do nó em JSON
    Describe,
}

#[derive(Debug, Deserialize)]
struct JobsFile {
    jobs: Vec<Job>,
}

#[derive(Debug, Deserialize)]
struct Job {
    images: Vec<PathBuf>,
    filename: Option<String>,
    path: Option<String>,
    extension: Option<String>,
    prompt: Option<PathBuf>,
    extra: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Some(Commands::Describe) = cli.command {
        println!("{}", serde_json::to_string_pretty(&node::node_definition())?);
        return Ok(());
    }

    let config_dir = cli.config.clone().unwrap_or_else(default_config_dir);
    let defaults = config::load_defaults_or_builtin(&config_dir)?;
    let output_dir = cli
        .output
        .clone()
        .unwrap_or_else(|| defaults.output_dir.clone());
    let mut saver = BatchImageSaver::with_time_format(output_dir, &defaults.time_format);

    match cli.command {
        Some(Commands::Batch { jobs }) => run_batch(&mut saver, &jobs, &defaults),
        _ => {
            let job = Job {
                images: cli.images,
                filename: cli.filename,
                path: cli.path,
                extension: cli.extension,
                prompt: cli.prompt,
                extra: cli.extra,
            };
            let response = run_job(&mut saver, &job, &defaults)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
    }
}

fn init_logging(debug: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if debug {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.try_init().unwrap_or_else(|e| {
        eprintln!("Falha ao iniciar o logger: {e}");
    });
}

fn default_config_dir() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));
    batchsave_lib::find_config_dir(&exe_dir)
}

fn load_json(path: Option<&Path>) -> Result<Option<Value>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Não foi possível ler {}", path.display()))?;
    let value = serde_json::from_str(&content)
        .with_context(|| format!("Erro ao parsear {}", path.display()))?;
    Ok(Some(value))
}

fn load_images(paths: &[PathBuf]) -> Result<Vec<ImageTensor>> {
    if paths.is_empty() {
        bail!("Informe ao menos uma imagem. Uso: batchsave <imagem>... [--filename <template>]");
    }
    paths
        .iter()
        .map(|path| -> Result<ImageTensor> {
            let img = image::open(path)
                .with_context(|| format!("Não foi possível abrir imagem: {}", path.display()))?;
            Ok(ImageTensor::from_image(&img))
        })
        .collect()
}

fn run_job(saver: &mut BatchImageSaver, job: &Job, defaults: &Defaults) -> Result<UiResponse> {
    let images = load_images(&job.images)?;
    let prompt = load_json(job.prompt.as_deref())?;
    let extra = load_json(job.extra.as_deref())?;

    let descriptors = saver.save(
        &images,
        job.filename.as_deref().unwrap_or(&defaults.filename),
        job.path.as_deref().unwrap_or(&defaults.path),
        job.extension.as_deref().unwrap_or(&defaults.extension),
        prompt.as_ref(),
        extra.as_ref(),
    )?;
    info!(
        "{} arquivo(s) salvos em {}",
        descriptors.len(),
        saver.output_dir().display()
    );
    Ok(UiResponse::new(descriptors))
}

fn run_batch(saver: &mut BatchImageSaver, jobs_path: &Path, defaults: &Defaults) -> Result<()> {
    let content = std::fs::read_to_string(jobs_path)
        .with_context(|| format!("Não foi possível ler {}", jobs_path.display()))?;
    let file: JobsFile = toml::from_str(&content)
        .with_context(|| format!("Erro ao parsear {}", jobs_path.display()))?;

    info!("Processando {} jobs...", file.jobs.len());

    let mut responses = Vec::new();
    let mut errors = Vec::new();
    for (i, job) in file.jobs.iter().enumerate() {
        info!("[{}/{}] {} imagem(ns)", i + 1, file.jobs.len(), job.images.len());
        match run_job(saver, job, defaults) {
            Ok(response) => responses.push(response),
            Err(e) => {
                error!("Job {} falhou: {e:#}", i + 1);
                errors.push((i + 1, e));
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&responses)?);

    if !errors.is_empty() {
        eprintln!("\n{} erro(s) encontrado(s):", errors.len());
        for (job, err) in &errors {
            eprintln!("  - job {job}: {err:#}");
        }
        bail!("{} de {} jobs falharam", errors.len(), file.jobs.len());
    }

    Ok(())
}
