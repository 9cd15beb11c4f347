use criterion::{black_box, criterion_group, criterion_main, Criterion};
use plan_ai::autofill::{estimate_fixed_costs, estimate_investment};
use plan_ai::{analyze_step, suggest, BusinessContext};
use plan_core::{BusinessData, BusinessType, ProductId, SizeCategory, Step};
use rust_decimal::Decimal;

fn build_plan(n_products: u32) -> BusinessData {
    let mut d = BusinessData::default();
    d.configuration.business_type = Some(BusinessType::Restaurant);
    d.configuration.size_category = Some(SizeCategory::Medium);
    d.configuration.location_text = "La Floresta, Quito".into();
    d.configuration.area_m2 = Decimal::new(120, 0);
    d.configuration.capacity = 45;
    let ctx = BusinessContext::from_configuration(&d.configuration);
    d.investment = estimate_investment(&ctx, &d.investment);
    d.fixed_costs = estimate_fixed_costs(&ctx, &d.fixed_costs);
    let dishes = ["Seco de pollo", "Ceviche", "Hornado", "Pizza", "Empanada"];
    for i in 0..n_products {
        let name = dishes[i as usize % dishes.len()];
        let s = suggest(name, BusinessType::Restaurant);
        d.variable_costs.products.push(plan_core::Product {
            id: ProductId(i + 1),
            name: name.into(),
            ingredients: s.to_ingredients(),
            ..plan_core::Product::default()
        });
        d.pricing
            .sale_prices
            .insert(ProductId(i + 1), Decimal::new(850, 2));
    }
    d
}

fn bench_analysis(c: &mut Criterion) {
    let plan = build_plan(40);
    c.bench_function("heuristics 40 products x 5 steps", |b| {
        b.iter(|| {
            for step in Step::ALL {
                let _ = black_box(analyze_step(step, black_box(&plan)));
            }
        })
    });
}

criterion_group!(benches, bench_analysis);
criterion_main!(benches);
