use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use depot_core::TenantId;
use depot_events::{EventEnvelope, InMemoryEventBus};
use depot_infra::event_store::InMemoryEventStore;
use depot_infra::provisioning::{NewCompany, NewWarehouse, TenantContext, WarehouseService};
use depot_parties::ContactInfo;
use depot_stock::{DeliverySteps, ReceptionSteps};
use serde_json::Value as JsonValue;

type Service = WarehouseService<InMemoryEventStore, InMemoryEventBus<EventEnvelope<JsonValue>>>;

fn service_with_company() -> (Service, TenantContext) {
    let service = WarehouseService::new(InMemoryEventStore::new(), InMemoryEventBus::new());
    let tenant_id = TenantId::new();
    let company = service
        .register_company(
            tenant_id,
            NewCompany {
                name: "Bench Co".to_string(),
                contact: ContactInfo::default(),
            },
        )
        .unwrap();
    (service, TenantContext::new(tenant_id, Some(company.company_id)))
}

fn warehouse(n: usize, reception: ReceptionSteps, delivery: DeliverySteps) -> NewWarehouse {
    NewWarehouse {
        name: Some(format!("Warehouse {n}")),
        code: format!("W{n}"),
        reception_steps: Some(reception),
        delivery_steps: Some(delivery),
        ..Default::default()
    }
}

/// Latency of provisioning one warehouse, smallest and largest layouts.
fn bench_create_warehouse(c: &mut Criterion) {
    let mut group = c.benchmark_group("create_warehouse");
    group.throughput(Throughput::Elements(1));

    let layouts = [
        ("one_step", ReceptionSteps::OneStep, DeliverySteps::ShipOnly),
        ("three_steps", ReceptionSteps::ThreeSteps, DeliverySteps::PickPackShip),
    ];
    for (label, reception, delivery) in layouts {
        group.bench_function(label, |b| {
            b.iter_batched(
                service_with_company,
                |(service, ctx)| {
                    black_box(
                        service
                            .create_warehouse(&ctx, warehouse(1, reception, delivery))
                            .unwrap(),
                    )
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// Rebuilding read models from a tenant log holding N warehouses.
fn bench_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("rebuild_read_models");

    for count in [1usize, 10, 50] {
        let (service, ctx) = service_with_company();
        for n in 0..count {
            service
                .create_warehouse(
                    &ctx,
                    warehouse(n, ReceptionSteps::TwoSteps, DeliverySteps::PickShip),
                )
                .unwrap();
        }

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("warehouses", count), &count, |b, _| {
            b.iter(|| service.rebuild(black_box(ctx.tenant_id)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_create_warehouse, bench_rebuild);
criterion_main!(benches);
