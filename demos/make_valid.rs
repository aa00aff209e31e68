use clap::Parser;
use geo_makevalid::{Classifier, MakeValid};
use geo_types::{Coord, Geometry as GeoGeometry, LineString, MultiPolygon, Polygon, Rect};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, Value};
use std::convert::TryInto;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input GeoJSON file (Polygons / MultiPolygons, possibly invalid)
    #[arg(short, long)]
    input: PathBuf,

    /// Output GeoJSON file (valid Polygons)
    #[arg(short, long)]
    output: PathBuf,

    /// Envelope margin around the data
    #[arg(long, default_value_t = 10.0)]
    margin: f64,

    /// Worker threads (defaults to the global pool)
    #[arg(long)]
    threads: Option<usize>,

    /// Extent as minx,miny,maxx,maxy
    #[arg(long, value_delimiter = ',', num_args = 4)]
    extent: Option<Vec<f64>>,
}

fn collect(geom: GeoGeometry<f64>, out: &mut Vec<Polygon<f64>>) {
    match geom {
        GeoGeometry::Polygon(p) => out.push(p),
        GeoGeometry::MultiPolygon(mp) => out.extend(mp.0),
        GeoGeometry::GeometryCollection(gc) => {
            for g in gc {
                collect(g, out);
            }
        }
        other => eprintln!("Skipping non-polygonal geometry: {:?}", other),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    println!("Reading input from {:?}", args.input);
    let reader = BufReader::new(File::open(&args.input)?);
    let geojson: GeoJson = serde_json::from_reader(reader)?;

    let mut polygons = Vec::new();
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in fc.features {
                if let Some(geom) = feature.geometry {
                    collect(geom.try_into()?, &mut polygons);
                }
            }
        }
        GeoJson::Feature(feature) => {
            if let Some(geom) = feature.geometry {
                collect(geom.try_into()?, &mut polygons);
            }
        }
        GeoJson::Geometry(geom) => collect(geom.try_into()?, &mut polygons),
    }

    let source = MultiPolygon::new(polygons);
    let classifier = Classifier::from_multi_polygon(&source);
    let fragments: Vec<LineString<f64>> = source
        .iter()
        .flat_map(|p| std::iter::once(p.exterior().clone()).chain(p.interiors().iter().cloned()))
        .collect();
    println!("Loaded {} polygons ({} rings). Repairing...", source.0.len(), fragments.len());

    let extent = args.extent.as_deref().map(|e| {
        Rect::new(Coord { x: e[0], y: e[1] }, Coord { x: e[2], y: e[3] })
    });

    let mut runner = MakeValid::new().with_margin(args.margin);
    if let Some(n) = args.threads {
        runner = runner.with_parallelism(n);
    }
    let repaired = runner.make_valid(&classifier, extent, &fragments)?;
    println!("Produced {} polygons.", repaired.0.len());

    let features: Vec<Feature> = repaired
        .iter()
        .map(|poly| Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::from(poly))),
            id: None,
            properties: None,
            foreign_members: None,
        })
        .collect();

    let output_fc = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };

    let writer = BufWriter::new(File::create(&args.output)?);
    serde_json::to_writer_pretty(writer, &GeoJson::FeatureCollection(output_fc))?;
    println!("Wrote output to {:?}", args.output);

    Ok(())
}
