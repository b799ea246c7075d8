use super::distance::haversine_km;
use super::rank::{NeighborResult, RankingReport};
use super::types::Point;
use image::ImageReader;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use plotters::style::PaletteColor;
use serde::Deserialize;
use std::path::Path;

type Chart2d<'a> = ChartContext<'a, BitMapBackend<'a>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;
type Coord = (f64, f64);
type TargetColor = PaletteColor<Palette99>;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VizConfig {
    pub enabled: bool,
    pub file_name: String,
    pub image_size: (u32, u32),
    /// Draw over a background image instead of a blank canvas
    pub enable_map: bool,
    pub map_image: String,
    /// Fit the chart to the data instead of the whole globe
    pub fit_to_sites: bool,
    pub show_candidates: bool,
    pub show_routes: bool,
    pub show_distances: bool,
    /// Caption, axis and site labels; off renders markers and lines only
    pub show_labels: bool,
    pub font_size: f64,
    pub line_thickness: u32,
}

impl Default for VizConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            file_name: "nearest_neighbors_map.png".to_string(),
            image_size: (1280, 800),
            enable_map: false,
            map_image: "images/map.png".to_string(),
            fit_to_sites: true,
            show_candidates: true,
            show_routes: false,
            show_distances: true,
            show_labels: true,
            font_size: 16.0,
            line_thickness: 2,
        }
    }
}

/// lon/lat window covering every plotted site, padded and clamped to the globe.
fn chart_bounds(report: &RankingReport, candidates: &[Point], options: &VizConfig) -> (Coord, Coord) {
    let mut sites = report
        .iter()
        .flat_map(|r| std::iter::once(&r.target).chain(r.neighbors.iter().map(|n| &n.site)))
        .peekable();
    if !options.fit_to_sites || sites.peek().is_none() {
        return ((-180.0, 180.0), (-90.0, 90.0));
    }

    let sites: Vec<&Point> = if options.show_candidates {
        sites.chain(candidates.iter()).collect()
    } else {
        sites.collect()
    };
    let (mut min_lon, mut max_lon) = (f64::MAX, f64::MIN);
    let (mut min_lat, mut max_lat) = (f64::MAX, f64::MIN);
    // lenient input may sit off the globe; clamp first so the window stays ordered
    for s in sites {
        let lon = s.longitude().clamp(-180.0, 180.0);
        let lat = s.latitude().clamp(-90.0, 90.0);
        min_lon = min_lon.min(lon);
        max_lon = max_lon.max(lon);
        min_lat = min_lat.min(lat);
        max_lat = max_lat.max(lat);
    }
    let pad_lon = ((max_lon - min_lon) * 0.1).max(0.5);
    let pad_lat = ((max_lat - min_lat) * 0.1).max(0.5);
    (
        ((min_lon - pad_lon).max(-180.0), (max_lon + pad_lon).min(180.0)),
        ((min_lat - pad_lat).max(-90.0), (max_lat + pad_lat).min(90.0)),
    )
}

/// Byte length of an RGB8 buffer, computed in `usize` so large canvases don't wrap.
fn rgb_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 3
}

/// Render targets, their neighbours and connecting segments to a PNG.
pub fn render_map(
    filename: &Path,
    caption: &str,
    report: &RankingReport,
    candidates: &[Point],
    options: &VizConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let (width, height) = options.image_size;
    let mut buffer = if options.enable_map {
        let map_image = ImageReader::open(&options.map_image)?.decode()?;
        let resized = image::imageops::resize(
            &map_image.to_rgb8(),
            width,
            height,
            image::imageops::FilterType::Lanczos3,
        );
        resized.into_raw()
    } else {
        vec![255; rgb_len(width, height)]
    };

    let ((x0, x1), (y0, y1)) = chart_bounds(report, candidates, options);

    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();

        let mut builder = ChartBuilder::on(&root);
        builder.margin(20);
        if options.show_labels {
            builder
                .caption(caption, ("sans-serif", 40).into_font())
                .x_label_area_size(50)
                .y_label_area_size(50);
        }
        let mut chart: Chart2d<'_> = builder.build_cartesian_2d(x0..x1, y0..y1)?;

        if options.show_labels {
            chart
                .configure_mesh()
                .x_desc("Longitude")
                .y_desc("Latitude")
                .draw()?;
        }

        if options.show_candidates {
            draw_candidates(&mut chart, candidates, options)?;
        }
        for (i, result) in report.iter().enumerate() {
            let color: TargetColor = Palette99::pick(i);
            draw_neighbors(&mut chart, result, &color, options)?;
            if options.show_routes {
                draw_route(&mut chart, result, &color, options)?;
            }
        }
        draw_targets(&mut chart, report, options)?;

        root.present()?;
    }

    if let Some(parent) = filename.parent() {
        std::fs::create_dir_all(parent)?;
    }
    image::save_buffer(filename, &buffer, width, height, image::ColorType::Rgb8)?;
    Ok(())
}

fn pos(p: &Point) -> Coord {
    (p.longitude(), p.latitude())
}

fn draw_candidates(
    chart: &mut Chart2d<'_>,
    candidates: &[Point],
    options: &VizConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let radius = (options.line_thickness as i32).max(2);
    chart.draw_series(
        candidates
            .iter()
            .map(|c| Circle::new(pos(c), radius, BLACK.mix(0.25).filled())),
    )?;
    Ok(())
}

fn draw_targets(
    chart: &mut Chart2d<'_>,
    report: &RankingReport,
    options: &VizConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    chart.draw_series(report.iter().map(|r| {
        EmptyElement::at(pos(&r.target))
            + Cross::new((0, 0), 10, RED.stroke_width(options.line_thickness + 1))
    }))?;
    if !options.show_labels {
        return Ok(());
    }
    chart.draw_series(report.iter().map(|r| {
        EmptyElement::at(pos(&r.target))
            + Text::new(
                r.target.id().to_string(),
                (8, -8),
                ("sans-serif", options.font_size)
                    .into_font()
                    .style(FontStyle::Bold)
                    .color(&RED),
            )
    }))?;
    Ok(())
}

fn draw_neighbors(
    chart: &mut Chart2d<'_>,
    result: &NeighborResult,
    color: &TargetColor,
    options: &VizConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let from = pos(&result.target);
    for (rank, neighbor) in result.neighbors.iter().enumerate() {
        let to = pos(&neighbor.site);
        draw_segment(chart, color, from, to, options)?;
        chart.draw_series(std::iter::once(Circle::new(
            to,
            options.line_thickness as i32 * 3,
            color.filled(),
        )))?;
        if !options.show_labels {
            continue;
        }

        let label = if options.show_distances {
            format!("{}. {} ({:.1} km)", rank + 1, neighbor.id(), neighbor.distance_km)
        } else {
            format!("{}. {}", rank + 1, neighbor.id())
        };
        chart.draw_series(std::iter::once(
            EmptyElement::at(to)
                + Text::new(
                    label,
                    (8, 8),
                    ("sans-serif", options.font_size * 0.75)
                        .into_font()
                        .color(&BLACK.mix(0.8)),
                ),
        ))?;
    }
    Ok(())
}

fn draw_route(
    chart: &mut Chart2d<'_>,
    result: &NeighborResult,
    color: &TargetColor,
    options: &VizConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    if result.neighbors.len() < 2 {
        return Ok(());
    }
    let mut prev = pos(&result.neighbors[0].site);
    for neighbor in result.neighbors.iter().skip(1) {
        let next = pos(&neighbor.site);
        draw_segment(chart, color, prev, next, options)?;
        if options.show_distances && options.show_labels {
            draw_leg_label(chart, color, prev, next, options)?;
        }
        prev = next;
    }
    Ok(())
}

fn draw_segment(
    chart: &mut Chart2d<'_>,
    color: &TargetColor,
    from: Coord,
    to: Coord,
    options: &VizConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    if (to.0 - from.0).abs() > 180.0 {
        draw_wrapped_segment(chart, color, from, to, options)
    } else {
        chart.draw_series(LineSeries::new(
            vec![from, to],
            ShapeStyle::from(&color.mix(0.6)).stroke_width(options.line_thickness),
        ))?;
        Ok(())
    }
}

/// Split a segment that crosses the antimeridian into two pieces.
fn draw_wrapped_segment(
    chart: &mut Chart2d<'_>,
    color: &TargetColor,
    from: Coord,
    to: Coord,
    options: &VizConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let dist_to_edge = 180.0 - from.0.abs();
    let dist_from_edge = 180.0 - to.0.abs();
    let span = dist_to_edge + dist_from_edge;
    let fraction = if span > 0.0 { dist_to_edge / span } else { 0.5 };
    let y_edge = from.1 + (to.1 - from.1) * fraction;

    let (edge1_x, edge2_x) = if from.0 > 0.0 {
        (180.0, -180.0)
    } else {
        (-180.0, 180.0)
    };

    let style = ShapeStyle::from(&color.mix(0.6)).stroke_width(options.line_thickness);
    chart.draw_series(LineSeries::new(vec![from, (edge1_x, y_edge)], style))?;
    chart.draw_series(LineSeries::new(vec![(edge2_x, y_edge), to], style))?;
    Ok(())
}

fn draw_leg_label(
    chart: &mut Chart2d<'_>,
    color: &TargetColor,
    from: Coord,
    to: Coord,
    options: &VizConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let dist_km = haversine_km(from.1, from.0, to.1, to.0);
    let label_pos = ((from.0 + to.0) / 2.0, (from.1 + to.1) / 2.0);

    chart.draw_series(std::iter::once(
        EmptyElement::at(label_pos)
            + Text::new(
                format!("{:.1} km", dist_km),
                (0, 0),
                ("sans-serif", options.font_size * 0.7)
                    .into_font()
                    .color(color),
            ),
    ))?;
    Ok(())
}
