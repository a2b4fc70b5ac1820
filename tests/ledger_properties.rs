use proptest::prelude::*;
use rust_decimal::Decimal;
use storefront_agents::domain::ledger::Ledger;
use storefront_agents::domain::loyalty::{LoyaltyState, LoyaltyTier};
use storefront_agents::domain::purchase::{Money, ProductPurchase, PurchaseRecord};
use storefront_agents::interfaces::json::purchase_codec::{encode_purchase, parse_purchase};

fn record(client: &str, timestamp: i64, cents: i64) -> PurchaseRecord {
    PurchaseRecord {
        client_id: client.to_string(),
        location: "ottawa".to_string(),
        timestamp,
        total: Money::new(Decimal::new(cents, 2)),
        message: None,
        items: Vec::new(),
    }
}

fn items() -> impl Strategy<Value = Vec<ProductPurchase>> {
    prop::collection::vec(("[a-z][a-z ]{0,11}", 0i64..10_000_000), 0..20).prop_map(|rows| {
        rows.into_iter()
            .map(|(product, cents)| ProductPurchase::new(product, Money::new(Decimal::new(cents, 2))))
            .collect()
    })
}

fn purchases() -> impl Strategy<Value = Vec<(u8, i64, i64)>> {
    prop::collection::vec((0u8..4, 0i64..10_000, 0i64..100_000), 0..60)
}

proptest! {
    #[test]
    fn total_spent_is_sum_of_client_totals(rows in purchases()) {
        let mut ledger = Ledger::new();
        let mut expected = [Decimal::ZERO; 4];
        for (client, ts, cents) in &rows {
            ledger.append(record(&format!("C{client}"), *ts, *cents));
            expected[*client as usize] += Decimal::new(*cents, 2);
        }
        for (client, sum) in expected.iter().enumerate() {
            prop_assert_eq!(ledger.total_spent(&format!("C{client}")), Some(Money::new(*sum)));
        }
    }

    #[test]
    fn most_recent_before_is_strictly_earlier(rows in purchases(), query_ts in 0i64..10_000) {
        let mut ledger = Ledger::new();
        for (client, ts, cents) in &rows {
            ledger.append(record(&format!("C{client}"), *ts, *cents));
        }
        let query = ledger.append(record("C0", query_ts, 0)).clone();

        let expected_ts = rows
            .iter()
            .filter(|(client, ts, _)| *client == 0 && *ts < query_ts)
            .map(|(_, ts, _)| *ts)
            .max();
        let found = ledger.most_recent_before("C0", &query);
        prop_assert_eq!(found.map(|r| r.timestamp), expected_ts);
        if let Some(prior) = found {
            prop_assert!(prior.timestamp < query.timestamp);
            prop_assert_eq!(prior.client_id.as_str(), "C0");
        }
    }

    #[test]
    fn loyalty_tiers_never_go_down(spends in prop::collection::vec(0i64..10_000, 1..30)) {
        let mut state = LoyaltyState::new();
        let mut spent = Money::ZERO;
        let mut previous = LoyaltyTier::None;
        for cents in spends {
            spent = spent.checked_add(Money::new(Decimal::new(cents, 2))).unwrap();
            let reached = state.advance("C1", spent);
            prop_assert!(reached.windows(2).all(|w| w[0] < w[1]));
            let tier = state.tier("C1");
            prop_assert!(tier >= previous);
            previous = tier;
        }
    }

    #[test]
    fn encoded_purchase_parses_back(items in items()) {
        let json = encode_purchase(&items).unwrap();
        let body = parse_purchase(&json).unwrap();

        let expected_total = Money::checked_sum(items.iter().map(|i| i.amount)).unwrap();
        prop_assert_eq!(body.total, expected_total);
        prop_assert_eq!(body.items.len(), items.len());
        prop_assert_eq!(body.items, items);
        prop_assert_eq!(body.message, None);
    }
}
