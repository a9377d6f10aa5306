//! Property-based tests for the custody accounting.
//!
//! Random sequences of deposits, withdrawals, fee accruals and collections
//! from several holders on several positions must:
//!
//! 1. Keep `audit()` green after every step.
//! 2. Keep the sum of balances on a position at or below its total.
//! 3. Leave balances untouched by any failed operation.

use lp_custody_execution::prelude::*;
use lp_custody_protocols::memory::InMemoryAmm;
use proptest::prelude::*;
use rust_decimal_macros::dec;
use std::sync::Arc;

const HOLDERS: u64 = 3;
const POSITIONS: usize = 2;

#[derive(Debug, Clone)]
enum Op {
    Deposit { holder: u64, position: usize, amount: Liquidity },
    Withdraw { holder: u64, position: usize, amount: Liquidity },
    Accrue { position: usize, fees: u64 },
    Collect { holder: u64, position: usize },
    FailNextRelease,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..HOLDERS, 0..POSITIONS, 0..2_000u128)
            .prop_map(|(holder, position, amount)| Op::Deposit { holder, position, amount }),
        3 => (0..HOLDERS, 0..POSITIONS, 0..2_000u128)
            .prop_map(|(holder, position, amount)| Op::Withdraw { holder, position, amount }),
        2 => (0..POSITIONS, 0..100_000u64).prop_map(|(position, fees)| Op::Accrue { position, fees }),
        1 => (0..HOLDERS, 0..POSITIONS).prop_map(|(holder, position)| Op::Collect { holder, position }),
        1 => Just(Op::FailNextRelease),
    ]
}

fn holder(i: u64) -> Address {
    Address::from_low_u64_be(0x100 + i)
}

fn vault() -> Address {
    Address::from_low_u64_be(0xc0)
}

async fn run(ops: Vec<Op>) -> Result<(), TestCaseError> {
    let amm = Arc::new(InMemoryAmm::new(Price::new(dec!(1))));
    let Ok(mut manager) = PositionManager::new(
        Address::from_low_u64_be(1),
        vault(),
        amm.clone(),
        amm.clone(),
        ManagerConfig::default(),
    ) else {
        panic!("default config is valid");
    };

    // Every holder starts with 5_000 of each position.
    let mut ids = Vec::with_capacity(POSITIONS);
    for _ in 0..POSITIONS {
        let id = amm.mint_position(holder(0), 5_000 * HOLDERS as u128).await;
        for i in 1..HOLDERS {
            let _ = amm.transfer(holder(0), holder(0), holder(i), id, 5_000).await;
        }
        ids.push(id);
    }
    for i in 0..HOLDERS {
        amm.set_approval_for_all(holder(i), vault(), true).await;
    }

    for op in ops {
        let snapshot: Vec<Liquidity> = ids
            .iter()
            .flat_map(|id| (0..HOLDERS).map(|i| manager.balance_of(holder(i), *id)))
            .collect();
        let logged = manager.events().len();

        let failed = match op {
            Op::Deposit { holder: h, position, amount } => {
                manager.deposit(holder(h), ids[position], amount).await.is_err()
            }
            Op::Withdraw { holder: h, position, amount } => {
                manager.withdraw(holder(h), ids[position], amount).await.is_err()
            }
            Op::Accrue { position, fees } => {
                let _ = amm.accrue_fees(ids[position], FeeAmounts::new(fees, fees / 3)).await;
                false
            }
            Op::Collect { holder: h, position } => {
                let _ = manager.collect_fees(holder(h), ids[position]).await;
                false
            }
            Op::FailNextRelease => {
                amm.fail_next_transfer(TransferError::Rejected("paused".into())).await;
                false
            }
        };

        prop_assert!(manager.audit().is_ok(), "audit failed: {:?}", manager.audit());

        for id in &ids {
            let sum: Liquidity = (0..HOLDERS).map(|i| manager.balance_of(holder(i), *id)).sum();
            prop_assert!(sum <= manager.position_total(*id));
            prop_assert_eq!(
                manager.position_total(*id),
                amm.balance_of(vault(), *id).await.unwrap_or(0)
            );
        }

        if failed {
            let after: Vec<Liquidity> = ids
                .iter()
                .flat_map(|id| (0..HOLDERS).map(|i| manager.balance_of(holder(i), *id)))
                .collect();
            prop_assert_eq!(snapshot, after);
            prop_assert_eq!(manager.events().len(), logged);
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_accounting_survives_random_sessions(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let Ok(runtime) = tokio::runtime::Builder::new_current_thread().enable_all().build() else {
            panic!("runtime builds");
        };
        runtime.block_on(run(ops))?;
    }
}
