use clap::Parser;

use convcode::presets::{self, PresetFile};
use convcode::{decode_block, encode_block, EncoderTables};
use std::path::PathBuf;
use std::rc::Rc;

/// Encode or decode a bit string through a convolutional code.
#[derive(Parser, Debug)]
#[command(author, version, about = "Convolutional encoder / Viterbi decoder")]
struct Args {
    /// Decode instead of encode
    #[arg(short = 'd', long, conflicts_with = "encode")]
    decode: bool,

    /// Encode (default)
    #[arg(short = 'e', long)]
    encode: bool,

    /// Disable the k-1 zero-bit tail, for tail-biting mode (the tail is
    /// appended/expected by default; pass this when driving the two-pass
    /// tail-biting protocol yourself via -s/-i)
    #[arg(short = 'b', long = "tail-biting")]
    tail_biting: bool,

    /// Use the recursive-systematic encoder variant
    #[arg(short = 'x', long)]
    recursive: bool,

    /// Decode in soft-decision mode, reading reliabilities from a trailing
    /// comma-separated list of integers the same length as the coded bits
    #[arg(short = 'r', long)]
    soft: bool,

    /// Decoder start state (reinit_decoder)
    #[arg(short = 's', long, default_value_t = 0)]
    start_state: usize,

    /// Decoder init_other_states sentinel (reinit_decoder)
    #[arg(short = 'i', long, default_value_t = convcode::DEFAULT_INIT_OTHER_STATES)]
    init_other_states: u32,

    /// Generator polynomial, high-bit-first (repeatable). Required unless
    /// --preset or --preset-file supplies one.
    #[arg(short = 'p', long = "poly")]
    polys: Vec<u32>,

    /// Named polynomial preset: voyager, lte, cdma2000, cassini, or one of
    /// the small k=3 worked examples (k3-5-7, k3-3-7, k3-5-3)
    #[arg(long, conflicts_with = "preset_file")]
    preset: Option<String>,

    /// TOML file of user-defined presets, used with --preset-name to select
    /// one entry (see `convcode::presets::PresetFile`)
    #[arg(long, requires = "preset_name")]
    preset_file: Option<PathBuf>,

    /// Preset name to select within --preset-file
    #[arg(long)]
    preset_name: Option<String>,

    /// Constraint length (should match the preset's, when one is given)
    k: u32,

    /// ASCII 0/1 bit string (the message to encode, or the coded stream to decode)
    bits: String,

    /// Comma-separated reliability values, required with -r
    reliability: Option<String>,
}

fn bits_from_str(s: &str) -> (Vec<u8>, usize) {
    let nbits = s.len();
    let mut bytes = vec![0u8; nbits.div_ceil(8)];
    for (i, c) in s.chars().enumerate() {
        if c == '1' {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }
    (bytes, nbits)
}

fn str_from_bits(bytes: &[u8], nbits: usize) -> String {
    (0..nbits)
        .map(|i| if (bytes[i / 8] >> (i % 8)) & 1 == 1 { '1' } else { '0' })
        .collect()
}

/// Resolves `-p/--poly` against `--preset`/`--preset-file`: an explicit `-p`
/// list always wins, otherwise the named or file preset supplies the
/// polynomials.
fn resolve_polys(args: &Args) -> Result<Vec<u32>, String> {
    if !args.polys.is_empty() {
        return Ok(args.polys.clone());
    }
    if let Some(name) = &args.preset {
        return presets::find(name)
            .map(|p| p.polys.to_vec())
            .ok_or_else(|| format!("unknown preset '{name}'"));
    }
    if let Some(path) = &args.preset_file {
        let preset_name = args.preset_name.as_deref().expect("clap enforces requires");
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("reading {}: {e}", path.display()))?;
        let file = PresetFile::parse_toml(&contents).map_err(|e| format!("{e}"))?;
        return file
            .presets
            .into_iter()
            .find(|p| p.name.eq_ignore_ascii_case(preset_name))
            .map(|p| p.polys)
            .ok_or_else(|| format!("preset '{preset_name}' not found in {}", path.display()));
    }
    Err("no polynomials given: pass -p/--poly, --preset NAME, or --preset-file FILE --preset-name NAME".to_string())
}

fn run(args: &Args) -> Result<(), String> {
    let do_tail = !args.tail_biting;
    let polys = resolve_polys(args)?;
    let tables =
        Rc::new(EncoderTables::build(args.k, &polys, args.recursive).map_err(|e| format!("{e}"))?);

    if args.decode {
        let (coded, nbits) = bits_from_str(&args.bits);

        let reliability = if args.soft {
            let raw = args
                .reliability
                .as_deref()
                .ok_or_else(|| "soft decode (-r) requires a reliability list".to_string())?;
            let values: Result<Vec<u8>, _> = raw.split(',').map(|v| v.trim().parse::<u8>()).collect();
            Some(values.map_err(|e| format!("bad reliability value: {e}"))?)
        } else {
            None
        };

        let max_bits = nbits + args.k as usize * tables.num_polys();
        let mut out = vec![0u8; max_bits.div_ceil(8)];
        let (dec_bits, num_errs) = decode_block(
            &tables,
            do_tail,
            args.start_state,
            args.init_other_states,
            convcode::DEFAULT_UNCERTAINTY_100,
            &coded,
            nbits,
            reliability.as_deref(),
            &mut out,
            None,
        )
        .map_err(|e| format!("{e}"))?;

        println!("{}", str_from_bits(&out, dec_bits));
        eprintln!("num_errs={num_errs}");
    } else {
        let (msg, nbits) = bits_from_str(&args.bits);
        let max_bits = (nbits + args.k as usize) * tables.num_polys();
        let mut out = vec![0u8; max_bits.div_ceil(8)];
        let enc_bits =
            encode_block(&tables, do_tail, 0, &msg, nbits, &mut out).map_err(|e| format!("{e}"))?;
        println!("{}", str_from_bits(&out, enc_bits));
    }

    Ok(())
}

fn main() {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("convcode: {e}");
        std::process::exit(1);
    }
}
