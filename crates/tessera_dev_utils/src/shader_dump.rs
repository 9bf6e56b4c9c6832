//! Shader Dump
//!
//! Prints the pixel shader generated for a descriptor or a JSON config.
//!
//! ```text
//! shader_dump --descriptor At00_Nnn0_Ly1010b0r0_V100 --dialect glsl
//! shader_dump --config material.json --dialect metal -o out.metal
//! shader_dump --descriptor Ac00_Nnn0_Ln0000l0r0_V000 --legacy
//! ```
//!
//! Set `RUST_LOG=debug` to trace feature resolution.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context as _, Result, bail};
use clap::{Parser, ValueEnum};
use tessera::{PlatformFlags, ShaderConfig, ShaderGenerator};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DialectArg {
    Hlsl,
    Metal,
    Glsl,
}

impl DialectArg {
    fn platform(self) -> PlatformFlags {
        match self {
            Self::Hlsl => PlatformFlags::DIRECT3D,
            Self::Metal => PlatformFlags::METAL,
            Self::Glsl => PlatformFlags::VULKAN,
        }
    }
}

#[derive(Parser)]
#[command(name = "shader_dump")]
#[command(about = "Dump generated pixel shader source")]
#[command(version)]
struct Args {
    /// Config descriptor, e.g. `At00_Nnn0_Ly1010b0r0_V100`
    #[arg(short, long, conflicts_with = "config")]
    descriptor: Option<String>,

    /// JSON file holding a serialized config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Target shading language
    #[arg(long, value_enum, default_value = "hlsl")]
    dialect: DialectArg,

    /// Use the `#define` template path instead of the feature graph
    #[arg(long)]
    legacy: bool,

    /// Print the normalized descriptor and exit
    #[arg(long)]
    describe: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn load_config(args: &Args) -> Result<ShaderConfig> {
    if let Some(descriptor) = &args.descriptor {
        return descriptor
            .parse::<ShaderConfig>()
            .with_context(|| format!("invalid descriptor `{descriptor}`"));
    }
    if let Some(path) = &args.config {
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        return serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()));
    }
    Ok(ShaderConfig::default())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = load_config(&args)?.propagated();
    if args.describe {
        println!("{}", config.create_description_txt());
        return Ok(());
    }

    let generator = ShaderGenerator::default();
    let platform = args.dialect.platform();

    let source = if args.legacy {
        let mut bytes = generator.create_pixel_shader_variation_legacy(&config, platform);
        if bytes.pop() != Some(0) {
            bail!("legacy generation failed for {config}");
        }
        String::from_utf8(bytes)?
    } else {
        let shader = generator.generate(&config, platform)?;
        log::info!(
            "{} {}: entry points {:?}, hash {:032x}",
            shader.dialect,
            shader.descriptor,
            shader.entry_points,
            shader.hash
        );
        shader.source
    };

    match &args.output {
        Some(path) => fs::write(path, source).with_context(|| format!("writing {}", path.display()))?,
        None => std::io::stdout().lock().write_all(source.as_bytes())?,
    }
    Ok(())
}
