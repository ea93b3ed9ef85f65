//! Cluster detection command line tool.
//!
//! Loads a luminosity grid (text matrix, JSON or raster image), estimates the
//! background, segments the grid into clusters and optionally projects and
//! names them.
//!
//! ```text
//! find_clusters background frame.png
//! find_clusters detect frame.png --sigma 5 --json clusters.json
//! find_clusters locate frame.png --wcs frame_wcs.json
//! find_clusters identify frame.png --wcs frame_wcs.json --radius 0.003
//! find_clusters pick frame.png --x 120.4 --y 87.9
//! ```

use std::error::Error;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clusterscan::image_proc::thresholding::apply_threshold;
use clusterscan::io::save_mask_image;
use clusterscan::{
    fit_background, load_grid, locate_clusters, ClusterCatalog, ClusterDetector, DetectionConfig,
    PixelGrid,
};
use log::info;
use skyid::{format_radec, SimbadClient, TanWcs};

#[derive(Parser)]
#[command(author, version, about = "Detect and identify luminous clusters in sky images", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that runs detection.
#[derive(Args, Debug)]
struct DetectionArgs {
    /// Input grid: .txt/.csv/.dat matrix, .json rows, or an image file
    input: PathBuf,

    /// Absolute threshold; skips the background fit when given
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Threshold as background + SIGMA * dispersion (default: 6)
    #[arg(short, long)]
    sigma: Option<f64>,

    /// JSON detection config; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Abort if any cluster grows beyond this many pixels
    #[arg(long)]
    max_cluster_pixels: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit the background level and noise dispersion
    Background {
        /// Input grid file
        input: PathBuf,

        /// Number of histogram bins (default: 200)
        #[arg(short, long)]
        bins: Option<usize>,
    },

    /// Detect clusters and report the brightest one
    Detect {
        #[command(flatten)]
        detection: DetectionArgs,

        /// Write the full catalog as JSON
        #[arg(long)]
        json: Option<PathBuf>,

        /// Write the thresholded mask as an image
        #[arg(long)]
        mask: Option<PathBuf>,
    },

    /// Sky position of the brightest cluster
    Locate {
        #[command(flatten)]
        detection: DetectionArgs,

        /// JSON file of TAN WCS keywords (CRPIX, CRVAL, CD or CDELT)
        #[arg(short, long)]
        wcs: PathBuf,
    },

    /// Name the brightest cluster through SIMBAD
    Identify {
        #[command(flatten)]
        detection: DetectionArgs,

        /// JSON file of TAN WCS keywords
        #[arg(short, long)]
        wcs: PathBuf,

        /// Cone search radius in degrees (default: 0.003)
        #[arg(short, long)]
        radius: Option<f64>,

        /// Identify every cluster instead of only the brightest
        #[arg(long)]
        all: bool,
    },

    /// List clusters whose bounding box contains a point
    Pick {
        #[command(flatten)]
        detection: DetectionArgs,

        /// Column coordinate
        #[arg(short, long)]
        x: f64,

        /// Row coordinate
        #[arg(short, long)]
        y: f64,
    },
}

impl DetectionArgs {
    fn load_config(&self) -> Result<DetectionConfig, Box<dyn Error>> {
        let mut config = match &self.config {
            Some(path) => DetectionConfig::load_from_file(path)?,
            None => DetectionConfig::default(),
        };
        if let Some(sigma) = self.sigma {
            config.threshold_sigma = sigma;
        }
        if self.max_cluster_pixels.is_some() {
            config.max_cluster_pixels = self.max_cluster_pixels;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Grid, threshold and catalog produced by one detection run.
struct DetectionRun {
    grid: PixelGrid,
    threshold: f64,
    catalog: ClusterCatalog,
    config: DetectionConfig,
}

fn run_detection(args: &DetectionArgs) -> Result<DetectionRun, Box<dyn Error>> {
    let config = args.load_config()?;
    let grid = load_grid(&args.input)?;

    let threshold = match args.threshold {
        Some(threshold) => threshold,
        None => {
            let model = fit_background(&grid, config.histogram_bins)?;
            info!(
                "Background {:.2}, dispersion {:.2}",
                model.background, model.dispersion
            );
            model.threshold(config.threshold_sigma)
        }
    };

    let catalog = ClusterDetector::new(config.clone()).detect(&grid, threshold)?;
    Ok(DetectionRun {
        grid,
        threshold,
        catalog,
        config,
    })
}

fn print_summary(catalog: &ClusterCatalog) {
    match catalog.brightest() {
        Some((_, cluster)) => println!(
            "number of clusters: {:2}, greatest integral: {:7}, centroid x: {:4.1}, centroid y: {:4.1}",
            catalog.len(),
            cluster.integrated_luminosity() as i64,
            cluster.centroid().x,
            cluster.centroid().y
        ),
        None => println!("number of clusters: {:2}", catalog.len()),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Background { input, bins } => {
            let grid = load_grid(&input)?;
            let bins = bins.unwrap_or(DetectionConfig::default().histogram_bins);
            let model = fit_background(&grid, bins)?;
            println!(
                "background: {}, dispersion: {}",
                model.background as i64, model.dispersion as i64
            );
        }

        Commands::Detect {
            detection,
            json,
            mask,
        } => {
            let run = run_detection(&detection)?;
            print_summary(&run.catalog);

            if let Some(path) = json {
                std::fs::write(&path, serde_json::to_string_pretty(&run.catalog)?)?;
                info!("Wrote {} clusters to {}", run.catalog.len(), path.display());
            }
            if let Some(path) = mask {
                save_mask_image(&apply_threshold(&run.grid, run.threshold), &path)?;
                info!("Wrote threshold mask to {}", path.display());
            }
        }

        Commands::Locate { detection, wcs } => {
            let run = run_detection(&detection)?;
            print_summary(&run.catalog);

            let wcs = TanWcs::load_from_file(&wcs)?;
            let enriched = locate_clusters(run.catalog, &wcs)?;
            if let Some((index, _)) = enriched.catalog().brightest() {
                if let Some(sky) = enriched.get(index).and_then(|(_, e)| e.sky) {
                    println!(
                        "right ascension: {:.3}, declination: {:.3}",
                        sky.ra_deg, sky.dec_deg
                    );
                    println!("{}", format_radec(&sky));
                }
            }
        }

        Commands::Identify {
            detection,
            wcs,
            radius,
            all,
        } => {
            let run = run_detection(&detection)?;
            print_summary(&run.catalog);

            let radius = radius.unwrap_or(run.config.search_radius_deg);
            let wcs = TanWcs::load_from_file(&wcs)?;
            let simbad = SimbadClient::new();
            let mut enriched = locate_clusters(run.catalog, &wcs)?;

            let targets: Vec<usize> = if all {
                (0..enriched.len()).collect()
            } else {
                enriched.catalog().brightest().map(|(i, _)| i).into_iter().collect()
            };
            for index in targets {
                if let Some(name) = enriched.identify_cluster(index, &simbad, radius)? {
                    println!("celestial object: {name}");
                }
            }
        }

        Commands::Pick { detection, x, y } => {
            let run = run_detection(&detection)?;
            let mut found = false;
            for (index, cluster) in run.catalog.clusters_at(x, y) {
                found = true;
                let bbox = cluster.bounding_box();
                println!(
                    "cluster {index}: {} px, integral {:.1}, box ({:.1}, {:.1}) {}x{}",
                    cluster.len(),
                    cluster.integrated_luminosity(),
                    bbox.x,
                    bbox.y,
                    bbox.width,
                    bbox.height
                );
            }
            if !found {
                println!("no cluster at ({x:.1}, {y:.1})");
            }
        }
    }

    Ok(())
}
