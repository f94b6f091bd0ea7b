//! Integration tests for warehouse provisioning.
//!
//! Tests: Service → UnitOfWork → EventStore → EventBus → Catalog read models
//!
//! Verifies:
//! - A new warehouse gets exactly the locations, operation types and routes
//!   its steps require
//! - Uniqueness and company consistency are enforced
//! - Failed operations leave the log untouched
//! - Writes reconcile records when steps, names or activity change

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use serde_json::Value as JsonValue;

    use depot_core::{CompanyId, TenantId};
    use depot_events::{EventBus, EventEnvelope, InMemoryEventBus};
    use depot_parties::ContactInfo;
    use depot_stock::{DeliverySteps, OperationKind, ReceptionSteps, SubLocation, WarehouseId};

    use crate::event_store::{EventStore, InMemoryEventStore};
    use crate::projections::{WarehouseFilter, WarehouseReadModel};
    use crate::provisioning::{
        NewCompany, NewPartner, NewWarehouse, ProvisioningError, TenantContext, WarehouseChanges,
        WarehouseService,
    };

    type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
    type Service = WarehouseService<Arc<InMemoryEventStore>, Bus>;

    struct Fixture {
        service: Service,
        store: Arc<InMemoryEventStore>,
        bus: Bus,
        tenant_id: TenantId,
        company_id: CompanyId,
    }

    impl Fixture {
        fn ctx(&self) -> TenantContext {
            TenantContext::new(self.tenant_id, Some(self.company_id))
        }

        fn create(&self, code: &str) -> WarehouseId {
            self.create_with(NewWarehouse {
                name: Some(format!("{code} warehouse")),
                code: code.to_string(),
                ..Default::default()
            })
        }

        fn create_with(&self, input: NewWarehouse) -> WarehouseId {
            self.service
                .create_warehouse(&self.ctx(), input)
                .unwrap()
                .warehouse
                .warehouse_id
        }

        fn log_len(&self) -> usize {
            self.store.load_tenant(self.tenant_id).unwrap().len()
        }
    }

    fn setup() -> Fixture {
        let store = Arc::new(InMemoryEventStore::new());
        let bus: Bus = Arc::new(InMemoryEventBus::new());
        let service = WarehouseService::new(store.clone(), bus.clone());
        let tenant_id = TenantId::new();
        let company = service
            .register_company(
                tenant_id,
                NewCompany {
                    name: "My Company".to_string(),
                    contact: ContactInfo::default(),
                },
            )
            .unwrap();

        Fixture {
            service,
            store,
            bus,
            tenant_id,
            company_id: company.company_id,
        }
    }

    fn sub_locations(f: &Fixture, id: WarehouseId) -> BTreeSet<SubLocation> {
        f.service
            .get_warehouse(f.tenant_id, id)
            .unwrap()
            .sub_locations
            .into_keys()
            .collect()
    }

    fn active_operation_kinds(f: &Fixture, id: WarehouseId) -> BTreeSet<OperationKind> {
        f.service
            .warehouse_operation_types(f.tenant_id, id)
            .unwrap()
            .into_iter()
            .filter(|pt| pt.active)
            .map(|pt| pt.kind)
            .collect()
    }

    fn is_constraint(err: &ProvisioningError, message: &str) -> bool {
        matches!(err, ProvisioningError::Constraint(m) if m == message)
    }

    #[test]
    fn one_step_warehouse_gets_minimal_layout() {
        let f = setup();
        let provisioned = f
            .service
            .create_warehouse(
                &f.ctx(),
                NewWarehouse {
                    name: Some("Main".to_string()),
                    code: "WH".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();
        let wh = provisioned.warehouse;

        assert_eq!(wh.code, "WH");
        assert_eq!(wh.company_id, f.company_id);
        assert_eq!(wh.reception_steps, ReceptionSteps::OneStep);
        assert_eq!(wh.delivery_steps, DeliverySteps::ShipOnly);
        assert_eq!(
            sub_locations(&f, wh.warehouse_id),
            BTreeSet::from([SubLocation::Stock])
        );
        assert_eq!(
            active_operation_kinds(&f, wh.warehouse_id),
            BTreeSet::from([
                OperationKind::Receipt,
                OperationKind::Delivery,
                OperationKind::Internal,
                OperationKind::Return,
            ])
        );

        // Reception + delivery are attached; cross-dock exists but stays archived.
        assert!(wh.routes.reception_route_id.is_some());
        assert!(wh.routes.delivery_route_id.is_some());
        assert!(wh.routes.mto_rule_id.is_some());
        assert_eq!(wh.routes.route_ids.len(), 2);
        let routes = f.service.warehouse_routes(f.tenant_id, wh.warehouse_id).unwrap();
        let crossdock = routes
            .iter()
            .find(|r| Some(r.route_id) == wh.routes.crossdock_route_id)
            .unwrap();
        assert!(!crossdock.header.active);
    }

    #[test]
    fn view_location_is_named_after_code_and_hangs_under_physical_root() {
        let f = setup();
        let id = f.create("SF01");
        let wh = f.service.get_warehouse(f.tenant_id, id).unwrap();
        let root = f.service.root_location(f.tenant_id);

        let locations = f.service.warehouse_locations(f.tenant_id, id).unwrap();
        assert_eq!(locations[0].location_id, wh.view_location_id);
        assert_eq!(locations[0].name, "SF01");
        assert!(f.service.is_descendant_of(f.tenant_id, wh.view_location_id, root));
        for sub in wh.sub_locations.values() {
            assert!(f.service.is_descendant_of(f.tenant_id, *sub, wh.view_location_id));
        }
    }

    #[test]
    fn three_step_delivery_provisions_pick_pack_and_their_locations() {
        let f = setup();
        let id = f.create_with(NewWarehouse {
            name: Some("Big".to_string()),
            code: "BIG".to_string(),
            reception_steps: Some(ReceptionSteps::ThreeSteps),
            delivery_steps: Some(DeliverySteps::PickPackShip),
            ..Default::default()
        });

        assert_eq!(
            sub_locations(&f, id),
            BTreeSet::from(SubLocation::ALL)
        );
        assert_eq!(
            active_operation_kinds(&f, id),
            BTreeSet::from(OperationKind::ALL)
        );

        let wh = f.service.get_warehouse(f.tenant_id, id).unwrap();
        assert_eq!(wh.routes.route_ids.len(), 3, "cross-dock active with input and output");
    }

    #[test]
    fn operation_types_number_with_the_warehouse_code() {
        let f = setup();
        let id = f.create("WH");
        let receipts = f
            .service
            .warehouse_operation_types(f.tenant_id, id)
            .unwrap()
            .into_iter()
            .find(|pt| pt.kind == OperationKind::Receipt)
            .unwrap();

        let first = f.service.reserve_number(f.tenant_id, receipts.sequence_id).unwrap();
        let second = f.service.reserve_number(f.tenant_id, receipts.sequence_id).unwrap();
        assert_eq!(first.name, "WH/IN/00001");
        assert_eq!(second.name, "WH/IN/00002");
    }

    #[test]
    fn code_is_unique_per_company_only() {
        let f = setup();
        f.create("WH");

        let err = f
            .service
            .create_warehouse(
                &f.ctx(),
                NewWarehouse {
                    name: Some("Other".to_string()),
                    code: "WH".to_string(),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(is_constraint(
            &err,
            "The short name of the warehouse must be unique per company!"
        ));

        let other = f
            .service
            .register_company(
                f.tenant_id,
                NewCompany {
                    name: "Other Co".to_string(),
                    contact: ContactInfo::default(),
                },
            )
            .unwrap();
        let ctx = TenantContext::new(f.tenant_id, Some(other.company_id));
        f.service
            .create_warehouse(
                &ctx,
                NewWarehouse {
                    name: Some("WH warehouse".to_string()),
                    code: "WH".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();
    }

    #[test]
    fn name_is_unique_per_company() {
        let f = setup();
        f.create("A");
        let err = f
            .service
            .create_warehouse(
                &f.ctx(),
                NewWarehouse {
                    name: Some("A warehouse".to_string()),
                    code: "B".to_string(),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(is_constraint(
            &err,
            "The name of the warehouse must be unique per company!"
        ));
    }

    #[test]
    fn rejected_create_writes_nothing() {
        let f = setup();
        f.create("WH");
        let before = f.log_len();

        let too_long = f.service.create_warehouse(
            &f.ctx(),
            NewWarehouse {
                name: Some("Long".to_string()),
                code: "TOOLONG".to_string(),
                ..Default::default()
            },
        );
        assert!(too_long.is_err());
        assert_eq!(f.log_len(), before);

        let foreign = f
            .service
            .register_partner(
                f.tenant_id,
                NewPartner {
                    name: "Elsewhere".to_string(),
                    contact: ContactInfo::default(),
                    company_id: Some(
                        f.service
                            .register_company(
                                f.tenant_id,
                                NewCompany {
                                    name: "Foreign".to_string(),
                                    contact: ContactInfo::default(),
                                },
                            )
                            .unwrap()
                            .company_id,
                    ),
                },
            )
            .unwrap();
        let before = f.log_len();

        let mismatched = f.service.create_warehouse(
            &f.ctx(),
            NewWarehouse {
                name: Some("Mismatch".to_string()),
                code: "MM".to_string(),
                partner_id: Some(foreign.partner_id),
                ..Default::default()
            },
        );
        assert!(mismatched.is_err());
        assert_eq!(f.log_len(), before);
        assert_eq!(
            f.service
                .search_warehouses(f.tenant_id, &WarehouseFilter::default())
                .len(),
            1
        );
    }

    #[test]
    fn defaults_follow_company_and_existing_warehouses() {
        let f = setup();
        let defaults = f.service.default_warehouse_values(&f.ctx());
        assert_eq!(defaults.name.as_deref(), Some("My Company"));
        assert_eq!(defaults.reception_steps, ReceptionSteps::OneStep);
        assert!(defaults.partner_id.is_some());

        let id = f.create_with(NewWarehouse {
            code: "WH".to_string(),
            ..Default::default()
        });
        let wh = f.service.get_warehouse(f.tenant_id, id).unwrap();
        assert_eq!(wh.name, "My Company");
        assert_eq!(wh.partner_id, defaults.partner_id);

        let defaults = f.service.default_warehouse_values(&f.ctx());
        assert_eq!(defaults.name.as_deref(), Some("My Company - warehouse # 2"));
    }

    #[test]
    fn partner_address_records_its_warehouse() {
        let f = setup();
        let id = f.create("WH");
        let wh = f.service.get_warehouse(f.tenant_id, id).unwrap();
        let partner = f
            .service
            .partner(f.tenant_id, wh.partner_id.unwrap())
            .unwrap();

        let stamped = partner.warehouse.unwrap();
        assert_eq!(stamped.warehouse_id, id.0);
    }

    #[test]
    fn first_warehouse_returns_advisory_and_second_enables_groups() {
        let f = setup();
        assert!(f.service.onchange_company(f.tenant_id).unwrap().is_some());

        let first = f
            .service
            .create_warehouse(
                &f.ctx(),
                NewWarehouse {
                    name: Some("One".to_string()),
                    code: "ONE".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(first.advisories.len(), 1);
        assert!(f.service.onchange_company(f.tenant_id).unwrap().is_some());

        let second = f
            .service
            .create_warehouse(
                &f.ctx(),
                NewWarehouse {
                    name: Some("Two".to_string()),
                    code: "TWO".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(second.advisories.len(), 1);
        assert!(f.service.onchange_company(f.tenant_id).unwrap().is_none());

        let third = f
            .service
            .create_warehouse(
                &f.ctx(),
                NewWarehouse {
                    name: Some("Three".to_string()),
                    code: "THREE".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(third.advisories.is_empty());
    }

    #[test]
    fn resupply_creates_one_route_per_supplier() {
        let f = setup();
        let a = f.create("A");
        let b = f.create("B");
        let c = f.create_with(NewWarehouse {
            name: Some("C warehouse".to_string()),
            code: "C".to_string(),
            resupply_wh_ids: vec![a, b, a],
            ..Default::default()
        });

        let wh = f.service.get_warehouse(f.tenant_id, c).unwrap();
        assert_eq!(wh.resupply_wh_ids, vec![a, b]);
        assert_eq!(wh.resupply_route_ids.len(), 2);

        let routes = f.service.warehouse_routes(f.tenant_id, c).unwrap();
        let resupply: Vec<_> = routes
            .iter()
            .filter(|r| r.header.supplied_wh_id == Some(c))
            .collect();
        assert_eq!(resupply.len(), 2);
        assert!(resupply.iter().all(|r| r.header.active));
        assert!(
            resupply
                .iter()
                .any(|r| r.header.name == "C warehouse: Supply Product from A warehouse")
        );

        // Dropping a supplier archives its route.
        let wh = f
            .service
            .write_warehouse(
                f.tenant_id,
                c,
                WarehouseChanges {
                    resupply_wh_ids: Some(vec![b]),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(wh.resupply_wh_ids, vec![b]);
        let from_a = f
            .service
            .warehouse_routes(f.tenant_id, c)
            .unwrap()
            .into_iter()
            .find(|r| r.header.supplier_wh_id == Some(a))
            .unwrap();
        assert!(!from_a.header.active);
    }

    #[test]
    fn renaming_supplier_renames_routes_it_feeds() {
        let f = setup();
        let a = f.create("A");
        let c = f.create_with(NewWarehouse {
            name: Some("C warehouse".to_string()),
            code: "C".to_string(),
            resupply_wh_ids: vec![a],
            ..Default::default()
        });

        f.service
            .write_warehouse(
                f.tenant_id,
                a,
                WarehouseChanges {
                    name: Some("Renamed".to_string()),
                    code: Some("RN".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        let route = f
            .service
            .warehouse_routes(f.tenant_id, c)
            .unwrap()
            .into_iter()
            .find(|r| r.header.supplier_wh_id == Some(a))
            .unwrap();
        assert_eq!(route.header.name, "C warehouse: Supply Product from Renamed");
        assert!(route.header.active);
        assert_eq!(route.rules[0].name, "RN: Stock → Inter-warehouse transit");
        assert!(route.rules[1].name.starts_with("C: "));

        // A later write of the supplied warehouse derives the same route.
        f.service
            .write_warehouse(f.tenant_id, c, WarehouseChanges::default())
            .unwrap();
        let after = f.service.warehouse_routes(f.tenant_id, c).unwrap();
        let again = after.iter().find(|r| r.route_id == route.route_id).unwrap();
        assert_eq!(again.header.name, route.header.name);
        assert_eq!(again.rules, route.rules);
    }

    #[test]
    fn growing_and_shrinking_steps_reconciles_records() {
        let f = setup();
        let id = f.create("WH");

        f.service
            .write_warehouse(
                f.tenant_id,
                id,
                WarehouseChanges {
                    reception_steps: Some(ReceptionSteps::TwoSteps),
                    delivery_steps: Some(DeliverySteps::PickShip),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(
            sub_locations(&f, id),
            BTreeSet::from([SubLocation::Stock, SubLocation::Input, SubLocation::Output])
        );
        assert!(active_operation_kinds(&f, id).contains(&OperationKind::Pick));
        let wh = f.service.get_warehouse(f.tenant_id, id).unwrap();
        assert_eq!(wh.routes.route_ids.len(), 3);

        f.service
            .write_warehouse(
                f.tenant_id,
                id,
                WarehouseChanges {
                    reception_steps: Some(ReceptionSteps::OneStep),
                    delivery_steps: Some(DeliverySteps::ShipOnly),
                    ..Default::default()
                },
            )
            .unwrap();

        // Obsolete records are archived, not removed.
        let locations = f.service.warehouse_locations(f.tenant_id, id).unwrap();
        let input = locations.iter().find(|l| l.name == "Input").unwrap();
        assert!(!input.active);
        assert!(!active_operation_kinds(&f, id).contains(&OperationKind::Pick));
        let wh = f.service.get_warehouse(f.tenant_id, id).unwrap();
        assert_eq!(wh.routes.route_ids.len(), 2);
    }

    #[test]
    fn renaming_code_renames_view_location_and_sequences() {
        let f = setup();
        let id = f.create("WH");
        f.service
            .write_warehouse(
                f.tenant_id,
                id,
                WarehouseChanges {
                    code: Some("NW".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        let locations = f.service.warehouse_locations(f.tenant_id, id).unwrap();
        assert_eq!(locations[0].name, "NW");

        let delivery = f
            .service
            .warehouse_operation_types(f.tenant_id, id)
            .unwrap()
            .into_iter()
            .find(|pt| pt.kind == OperationKind::Delivery)
            .unwrap();
        let reserved = f.service.reserve_number(f.tenant_id, delivery.sequence_id).unwrap();
        assert_eq!(reserved.name, "NW/OUT/00001");
    }

    #[test]
    fn archiving_warehouse_archives_routes_and_operation_types() {
        let f = setup();
        let id = f.create("WH");
        let wh = f
            .service
            .write_warehouse(
                f.tenant_id,
                id,
                WarehouseChanges {
                    active: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(!wh.active);
        assert!(active_operation_kinds(&f, id).is_empty());
        let routes = f.service.warehouse_routes(f.tenant_id, id).unwrap();
        assert!(routes.iter().all(|r| !r.header.active));

        let active = WarehouseFilter {
            active: Some(true),
            ..Default::default()
        };
        assert!(f.service.search_warehouses(f.tenant_id, &active).is_empty());
    }

    #[test]
    fn write_rejects_duplicate_name() {
        let f = setup();
        f.create("A");
        let b = f.create("B");
        let before = f.log_len();

        let err = f
            .service
            .write_warehouse(
                f.tenant_id,
                b,
                WarehouseChanges {
                    name: Some("A warehouse".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(is_constraint(
            &err,
            "The name of the warehouse must be unique per company!"
        ));
        assert_eq!(f.log_len(), before);
    }

    #[test]
    fn tenants_do_not_see_each_other() {
        let f = setup();
        f.create("WH");
        let other = TenantId::new();
        assert!(
            f.service
                .search_warehouses(other, &WarehouseFilter::default())
                .is_empty()
        );
        assert!(f.service.companies(other).is_empty());
    }

    #[test]
    fn rebuild_reproduces_read_models_from_log() {
        let f = setup();
        let id = f.create_with(NewWarehouse {
            name: Some("Main".to_string()),
            code: "WH".to_string(),
            delivery_steps: Some(DeliverySteps::PickPackShip),
            ..Default::default()
        });
        let before = f.service.get_warehouse(f.tenant_id, id).unwrap();
        let ops_before = f.service.warehouse_operation_types(f.tenant_id, id).unwrap();

        f.service.rebuild(f.tenant_id).unwrap();

        // Creation rank is a per-process ordering key, not replayed state.
        let after = f.service.get_warehouse(f.tenant_id, id).unwrap();
        assert_eq!(
            WarehouseReadModel {
                created_rank: 0,
                ..after
            },
            WarehouseReadModel {
                created_rank: 0,
                ..before
            }
        );
        assert_eq!(
            f.service.warehouse_operation_types(f.tenant_id, id).unwrap(),
            ops_before
        );
    }

    #[test]
    fn committed_events_are_published_on_the_bus() {
        let f = setup();
        let sub = f.bus.subscribe();
        f.create("WH");

        let mut types = BTreeSet::new();
        while let Ok(envelope) = sub.try_recv() {
            types.insert(envelope.aggregate_type().to_string());
        }
        assert!(types.contains(crate::streams::WAREHOUSE));
        assert!(types.contains(crate::streams::LOCATION));
        assert!(types.contains(crate::streams::ROUTE));
        assert!(types.contains(crate::streams::PICKING_TYPE));
    }

    mod step_transitions {
        use proptest::prelude::*;

        use depot_stock::StepConfig;

        use super::*;

        fn reception() -> impl Strategy<Value = ReceptionSteps> {
            prop_oneof![
                Just(ReceptionSteps::OneStep),
                Just(ReceptionSteps::TwoSteps),
                Just(ReceptionSteps::ThreeSteps),
            ]
        }

        fn delivery() -> impl Strategy<Value = DeliverySteps> {
            prop_oneof![
                Just(DeliverySteps::ShipOnly),
                Just(DeliverySteps::PickShip),
                Just(DeliverySteps::PickPackShip),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 64,
                ..ProptestConfig::default()
            })]

            /// Property: whatever the starting steps, a write leaves exactly the
            /// records the new steps require active.
            #[test]
            fn step_changes_leave_exactly_required_records_active(
                from_r in reception(),
                from_d in delivery(),
                to_r in reception(),
                to_d in delivery(),
            ) {
                let f = setup();
                let id = f.create_with(NewWarehouse {
                    name: Some("Main".to_string()),
                    code: "WH".to_string(),
                    reception_steps: Some(from_r),
                    delivery_steps: Some(from_d),
                    ..Default::default()
                });
                let wh = f
                    .service
                    .write_warehouse(
                        f.tenant_id,
                        id,
                        WarehouseChanges {
                            reception_steps: Some(to_r),
                            delivery_steps: Some(to_d),
                            ..Default::default()
                        },
                    )
                    .unwrap();
                let steps = StepConfig::new(to_r, to_d);

                let locations = &f.service.catalog().locations;
                let active_locations: BTreeSet<SubLocation> = wh
                    .sub_locations
                    .iter()
                    .filter(|(_, loc)| locations.get(f.tenant_id, loc).is_some_and(|l| l.active))
                    .map(|(sub, _)| *sub)
                    .collect();
                prop_assert_eq!(
                    active_locations,
                    steps.required_sub_locations().into_iter().collect::<BTreeSet<_>>()
                );
                prop_assert_eq!(
                    active_operation_kinds(&f, id),
                    steps.required_operation_kinds().into_iter().collect::<BTreeSet<_>>()
                );
                prop_assert_eq!(
                    wh.routes.route_ids.len(),
                    2 + usize::from(steps.crossdock_enabled())
                );
            }
        }
    }
}
