use crate::{compute::Summary, data::ChartKind};
use image::{codecs::png::PngEncoder, ExtendedColorType, ImageEncoder};
use plotters::{
    coord::Shift,
    drawing::DrawingArea,
    prelude::*,
    style::{
        register_font,
        text_anchor::{HPos, Pos, VPos},
    },
};
use rust_decimal::prelude::ToPrimitive;
use std::sync::OnceLock;

pub const MIME_TYPE: &str = "image/png";

const WIDTH: u32 = 700;
const HEIGHT: u32 = 500;

const FONT: &str = "sans-serif";
static FONT_DATA: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");
static FONT_LOADED: OnceLock<bool> = OnceLock::new();

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// plotters draws text with whatever font was registered under the family name,
/// so the bundled one goes in once per process.
fn load_font() -> anyhow::Result<()> {
    let loaded = *FONT_LOADED
        .get_or_init(|| register_font(FONT, FontStyle::Normal, FONT_DATA).is_ok());
    if !loaded {
        anyhow::bail!("bundled chart font is not a valid font file");
    }
    Ok(())
}

/// Draws the summary as a PNG. The summary must not be empty; callers check
/// that first since an empty chart is reported to the user rather than drawn.
pub(crate) fn render(summary: &Summary, kind: ChartKind) -> anyhow::Result<Vec<u8>> {
    if summary.is_empty() {
        anyhow::bail!("nothing to draw");
    }
    load_font()?;
    let mut buf = vec![0u8; (WIDTH * HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buf, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE)?;
        match kind {
            ChartKind::Pie => draw_pie(&root, summary)?,
            ChartKind::Bar => draw_bar(&root, summary)?,
        }
        root.present()?;
    }
    let mut png = Vec::new();
    PngEncoder::new(&mut png).write_image(&buf, WIDTH, HEIGHT, ExtendedColorType::Rgb8)?;
    Ok(png)
}

const PALETTE: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

const SKY_BLUE: RGBColor = RGBColor(135, 206, 235);

fn values(summary: &Summary) -> Vec<f64> {
    summary
        .iter()
        .map(|(_, total)| total.to_f64().unwrap_or(0.0))
        .collect()
}

/// Slices go clockwise from the upper left, each labelled with its category
/// outside and its share inside. Negative totals (hand-edited rows) get no slice.
fn draw_pie(root: &Area, summary: &Summary) -> anyhow::Result<()> {
    let sizes = values(summary)
        .into_iter()
        .map(|v| v.max(0.0))
        .collect::<Vec<_>>();
    if sizes.iter().sum::<f64>() <= 0.0 {
        anyhow::bail!("no positive total to draw");
    }
    let labels = summary.iter().map(|(c, _)| c).collect::<Vec<_>>();
    let colors = (0..sizes.len())
        .map(|i| PALETTE[i % PALETTE.len()])
        .collect::<Vec<_>>();
    root.titled("Expense Distribution by Category", (FONT, 22))?;

    let center = (WIDTH as i32 / 2, HEIGHT as i32 / 2 + 15);
    let radius = 170.0;
    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.start_angle(-140.0);
    pie.label_style((FONT, 16).into_font().color(&BLACK));
    pie.percentages((FONT, 14).into_font().color(&BLACK));
    root.draw(&pie)?;
    Ok(())
}

/// Bars with the category names under them and the total written on top.
fn draw_bar(root: &Area, summary: &Summary) -> anyhow::Result<()> {
    let names = summary.iter().map(|(c, _)| c).collect::<Vec<_>>();
    let values = values(summary);
    let max = values.iter().cloned().fold(0.0, f64::max);
    let top = if max > 0.0 { max * 1.15 } else { 1.0 };

    let mut chart = ChartBuilder::on(root)
        .caption("Expenses by Category", (FONT, 22))
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d((0..names.len()).into_segmented(), 0.0..top)?;
    let category_label = |x: &SegmentValue<usize>| match x {
        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
            names.get(*i).map(|n| n.to_string()).unwrap_or_default()
        }
        SegmentValue::Last => String::new(),
    };
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(names.len() + 1)
        .x_label_formatter(&category_label)
        .x_desc("Category")
        .y_desc("Total Amount")
        .label_style((FONT, 14))
        .draw()?;

    chart.draw_series(values.iter().enumerate().map(|(i, v)| {
        let mut bar = Rectangle::new(
            [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), v.max(0.0))],
            SKY_BLUE.filled(),
        );
        bar.set_margin(0, 0, 8, 8);
        bar
    }))?;
    let value_style =
        TextStyle::from((FONT, 14).into_font()).pos(Pos::new(HPos::Center, VPos::Bottom));
    chart.draw_series(values.iter().enumerate().map(|(i, v)| {
        Text::new(
            format!("{v:.2}"),
            (SegmentValue::CenterOf(i), v.max(0.0)),
            value_style.clone(),
        )
    }))?;
    Ok(())
}
