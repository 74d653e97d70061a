use criterion::{Criterion, black_box, criterion_group, criterion_main};
use qi_core::{ChartInput, EngineConfig, PatternRegistry, analyze};

fn natal_chart() -> ChartInput {
    ChartInput::parse_natal(["JiaZi", "GengChen", "BingYin", "WuXu"]).unwrap()
}

fn full_chart() -> ChartInput {
    natal_chart()
        .with_luck("YiHai".parse().unwrap())
        .with_annual("XinYou".parse().unwrap())
        .with_monthly("DingMao".parse().unwrap())
        .with_daily("RenShen".parse().unwrap())
        .with_hourly("GuiChou".parse().unwrap())
        .with_talisman("JiWei".parse().unwrap())
        .with_talisman("WuWu".parse().unwrap())
}

fn bench_analyze(c: &mut Criterion) {
    let registry = PatternRegistry::standard().unwrap();
    let config = EngineConfig::default();
    let natal = natal_chart();
    let full = full_chart();

    c.bench_function("analyze_natal", |b| {
        b.iter(|| analyze(black_box(&registry), &config, black_box(&natal)))
    });
    c.bench_function("analyze_full_chart", |b| {
        b.iter(|| analyze(black_box(&registry), &config, black_box(&full)))
    });
}

fn bench_registry(c: &mut Criterion) {
    c.bench_function("registry_standard", |b| b.iter(PatternRegistry::standard));
}

criterion_group!(benches, bench_analyze, bench_registry);
criterion_main!(benches);
