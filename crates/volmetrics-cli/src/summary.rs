use console::Style;
use volmetrics_core::config::EvalConfig;
use volmetrics_core::normalize::Normalization;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_eval_summary(config: &EvalConfig) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Volume Evaluation"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(17)));
    println!();

    println!(
        "  {:<16}{}",
        s.label.apply_to("Ground truth"),
        s.path.apply_to(config.ground_truth.display())
    );
    println!(
        "  {:<16}{}",
        s.label.apply_to("Reconstructed"),
        s.path.apply_to(config.reconstructed.display())
    );
    println!();

    println!("  {}", s.header.apply_to("Slicing"));
    println!(
        "    {:<14}{}",
        s.label.apply_to("Axes"),
        s.value.apply_to(config.axes)
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("Report every"),
        s.value.apply_to(format!("{} slices", config.report_every))
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("Workers"),
        s.value.apply_to(config.workers)
    );
    println!();

    println!("  {}", s.header.apply_to("Normalization"));
    println!(
        "    {:<14}{}",
        s.label.apply_to("Mode"),
        s.method.apply_to(config.normalization)
    );
    match config.normalization {
        Normalization::RawFloat => println!(
            "    {:<14}{}",
            s.label.apply_to("Peak"),
            s.value.apply_to(config.peak)
        ),
        Normalization::BoundedQuantization { .. } => println!(
            "    {:<14}{}",
            s.label.apply_to("Peak"),
            s.disabled.apply_to("quantization range")
        ),
    }
    println!();

    if let Some(ref csv) = config.output.per_slice_csv {
        println!(
            "  {:<16}{}",
            s.label.apply_to("Per-slice CSV"),
            s.path.apply_to(csv.display())
        );
    }
    if let Some(ref json) = config.output.summary_json {
        println!(
            "  {:<16}{}",
            s.label.apply_to("Summary JSON"),
            s.path.apply_to(json.display())
        );
    }
    if config.output.per_slice_csv.is_some() || config.output.summary_json.is_some() {
        println!();
    }
}
