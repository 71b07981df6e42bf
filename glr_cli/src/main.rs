//! Imports GLR scene rips and writes the resulting objects and materials as json.
//!
//! Options can be given in a json file (see [ImportOptions](glr_import::ImportOptions))
//! and overridden by flags.

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

use std::{fs, path::PathBuf, process};

use clap::{App, Arg, ArgGroup, ArgMatches};
use glr_import::{
    import_batch, FilterList, ImportOptions, ImportedScene, ListMode, SceneCollection,
};
use itertools::Itertools;
use n64_rdp::{mode::WrapCombo, ColorChannel};
use serde::Serialize;
use tracing::{info, warn};

mod logging;

const CHANNELS: &[&str] = &["shading", "primitive", "environment", "blend", "fog"];

#[derive(Serialize)]
struct Output<'a> {
    color_management: bool,
    objects: &'a [ImportedScene],
}

fn app() -> App<'static, 'static> {
    App::new("glr_import")
        .about("Imports GLR scene rips of N64 games")
        .arg(
            Arg::with_name("input")
                .value_name("FILE")
                .multiple(true)
                .help("GLR files to import"),
        )
        .arg(
            Arg::with_name("config")
                .long("config")
                .value_name("FILE")
                .help("json file with import options"),
        )
        .arg(
            Arg::with_name("move")
                .long("move")
                .value_name("X,Y,Z")
                .allow_hyphen_values(true)
                .help("object location"),
        )
        .arg(
            Arg::with_name("rotation")
                .long("rotation")
                .value_name("X,Y,Z")
                .allow_hyphen_values(true)
                .help("object rotation as XYZ Euler angles in radians"),
        )
        .arg(
            Arg::with_name("scale")
                .long("scale")
                .value_name("X,Y,Z")
                .allow_hyphen_values(true)
                .help("object scale"),
        )
        .arg(
            Arg::with_name("no-weld")
                .long("no-weld")
                .help("keep every triangle's vertices separate"),
        )
        .arg(
            Arg::with_name("weld-distance")
                .long("weld-distance")
                .value_name("DISTANCE")
                .help("merge vertices closer than this"),
        )
        .arg(
            Arg::with_name("no-fog")
                .long("no-fog")
                .help("do not add a fog volume"),
        )
        .arg(
            Arg::with_name("no-color-management")
                .long("no-color-management")
                .help("do not ask for an sRGB display"),
        )
        .arg(
            Arg::with_name("transparency")
                .long("transparency")
                .help("alpha-blend materials whose blender reads the framebuffer"),
        )
        .arg(
            Arg::with_name("backface-culling")
                .long("backface-culling")
                .help("hide back faces of materials that request culling"),
        )
        .arg(
            Arg::with_name("no-legacy")
                .long("no-legacy")
                .help("reject version 1 files"),
        )
        .arg(
            Arg::with_name("whitelist")
                .long("whitelist")
                .help("keep only listed textures instead of removing them"),
        )
        .arg(
            Arg::with_name("filter")
                .long("filter")
                .value_name("TOKENS")
                .help("comma separated texture CRCs (16 hex digits) or NO_TEXTURE"),
        )
        .arg(
            Arg::with_name("drop-untextured")
                .long("drop-untextured")
                .help("remove triangles without a texture"),
        )
        .arg(
            Arg::with_name("wrap")
                .long("wrap")
                .value_name("FROM=TO")
                .multiple(true)
                .number_of_values(1)
                .help("replace a wrap combination, e.g. WN_MN=WC_WC"),
        )
        .arg(
            Arg::with_name("no-color")
                .long("no-color")
                .value_name("CHANNEL")
                .possible_values(CHANNELS)
                .multiple(true)
                .number_of_values(1)
                .help("do not generate a color channel"),
        )
        .arg(
            Arg::with_name("invert-color")
                .long("invert-color")
                .value_name("CHANNEL")
                .possible_values(CHANNELS)
                .multiple(true)
                .number_of_values(1)
                .help("store 1 - RGB for a color channel"),
        )
        .arg(
            Arg::with_name("merge-alpha")
                .long("merge-alpha")
                .help("multiply alpha into the color channels"),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .value_name("FILE")
                .help("path to the output JSON file"),
        )
        .arg(
            Arg::with_name("stdout")
                .long("stdout")
                .help("print the JSON text to stdout"),
        )
        .arg(
            Arg::with_name("print-filter")
                .long("print-filter")
                .help("print the normalized filter expression"),
        )
        .group(
            ArgGroup::with_name("output-option")
                .args(&["output", "stdout", "print-filter"])
                .required(true)
                .multiple(true),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .help("log more, may be repeated"),
        )
        .arg(
            Arg::with_name("quiet")
                .short("q")
                .conflicts_with("verbose")
                .help("only log warnings and errors"),
        )
}

fn parse_vec3(name: &str, text: &str) -> Result<[f32; 3], String> {
    let invalid = || format!("invalid --{} value {:?}, expected X,Y,Z", name, text);
    let (x, y, z) = text
        .split(',')
        .map(|v| v.trim().parse::<f32>())
        .collect_tuple()
        .ok_or_else(invalid)?;
    Ok([
        x.map_err(|_| invalid())?,
        y.map_err(|_| invalid())?,
        z.map_err(|_| invalid())?,
    ])
}

fn parse_wrap(text: &str) -> Result<(WrapCombo, WrapCombo), String> {
    let parse = |name: &str| {
        WrapCombo::parse(name.trim())
            .ok_or_else(|| format!("unknown wrap combination {:?}", name))
    };
    let (from, to) = text
        .split_once('=')
        .ok_or_else(|| format!("invalid --wrap value {:?}, expected FROM=TO", text))?;
    Ok((parse(from)?, parse(to)?))
}

fn channel(name: &str) -> Option<ColorChannel> {
    CHANNELS
        .iter()
        .position(|&c| c == name)
        .map(|i| ColorChannel::ALL[i])
}

/// Loads the config file, if any, and applies the flags on top of it.
fn import_options(matches: &ArgMatches<'_>) -> Result<ImportOptions, String> {
    let mut options = match matches.value_of("config") {
        Some(path) => ImportOptions::load(path.as_ref()).map_err(|error| error.to_string())?,
        None => ImportOptions::default(),
    };

    if let Some(text) = matches.value_of("move") {
        options.move_by = parse_vec3("move", text)?;
    }
    if let Some(text) = matches.value_of("rotation") {
        options.rotation = parse_vec3("rotation", text)?;
    }
    if let Some(text) = matches.value_of("scale") {
        options.scale = parse_vec3("scale", text)?;
    }
    if matches.is_present("no-weld") {
        options.weld_vertices = false;
    }
    if let Some(text) = matches.value_of("weld-distance") {
        options.weld_distance = text
            .parse()
            .map_err(|_| format!("invalid --weld-distance value {:?}", text))?;
    }
    if matches.is_present("no-fog") {
        options.fog_volume = false;
    }
    if matches.is_present("no-color-management") {
        options.color_management = false;
    }
    if matches.is_present("transparency") {
        options.material_transparency = true;
    }
    if matches.is_present("backface-culling") {
        options.backface_culling = true;
    }
    if matches.is_present("no-legacy") {
        options.accept_legacy_format = false;
    }
    if matches.is_present("whitelist") {
        options.filter_mode = ListMode::Whitelist;
    }
    if let Some(filter) = matches.value_of("filter") {
        options.filter = filter.to_string();
    }
    if matches.is_present("drop-untextured") {
        options.drop_untextured = true;
    }
    for text in matches.values_of("wrap").into_iter().flatten() {
        let (from, to) = parse_wrap(text)?;
        options.wrap_overrides.set(from, to);
    }
    for name in matches.values_of("no-color").into_iter().flatten() {
        if let Some(channel) = channel(name) {
            options.colors.channel_mut(channel).enabled = false;
        }
    }
    for name in matches.values_of("invert-color").into_iter().flatten() {
        if let Some(channel) = channel(name) {
            options.colors.channel_mut(channel).invert = true;
        }
    }
    if matches.is_present("merge-alpha") {
        options.colors.merge_alpha = true;
    }

    Ok(options)
}

fn main() {
    let matches = app().get_matches();

    let level = logging::level(
        matches.occurrences_of("verbose"),
        matches.is_present("quiet"),
    );
    if let Err(error) = logging::init(level) {
        eprintln!("Error while initializing logging: {}", error);
    }

    let options = import_options(&matches).unwrap_or_else(|error| {
        eprintln!("Error: {}", error);
        process::exit(1);
    });

    if matches.is_present("print-filter") {
        let list = FilterList::parse(&options.filter).unwrap_or_else(|error| {
            eprintln!("Error: {}", error);
            process::exit(1);
        });
        println!("{}", list);
        if !matches.is_present("output") && !matches.is_present("stdout") {
            return;
        }
    }

    let paths: Vec<PathBuf> = matches
        .values_of("input")
        .into_iter()
        .flatten()
        .map(PathBuf::from)
        .collect();

    let mut collection = SceneCollection::default();
    let (report, session) =
        import_batch(&paths, options, &mut collection).unwrap_or_else(|error| {
            eprintln!("Error: {}", error);
            process::exit(1);
        });

    info!(
        "imported {} of {} files, {} materials, {} texture images",
        collection.objects.len(),
        paths.len(),
        session.materials().count(),
        session.images().len()
    );
    let missing = session.images().iter().filter(|(_, image)| !image.exists).count();
    if missing > 0 {
        warn!("{} texture images were not found", missing);
    }

    let json = serde_json::to_string_pretty(&Output {
        color_management: report.color_management,
        objects: &collection.objects,
    })
    .unwrap_or_else(|error| {
        eprintln!("Error while serializing: {}", error);
        process::exit(1);
    });

    if let Some(output_filename) = matches.value_of("output") {
        fs::write(output_filename, &json).unwrap_or_else(|error| {
            eprintln!("Error while writing {}: {}", output_filename, error);
            process::exit(1);
        });
    }
    if matches.is_present("stdout") {
        print!("{}", json);
    }

    if let Some(summary) = report.failure_summary() {
        eprintln!("Some files could not be imported:\n{}", summary);
        process::exit(1);
    }
}
