use ember_scenario::{
    run_claim_scenario, sim::SimChain, AssertionMode, ScenarioConfig, ScenarioError, Step,
};
use ember_schedule::{build_schedule, Address, EmissionTarget, RewardProgram, RATE_WIDTH_BITS};
use primitive_types::U256;

const ADMIN: Address = [0xAD; 20];
const WHALE: Address = [0x0E; 20];
const ASSET: Address = [0x01; 20];
const REWARD: Address = [0xEE; 20];
const ORACLE: Address = [0x0A; 20];
const AUTHORITY: Address = [0x7A; 20];

const START: u64 = 1_700_000_000;
const DURATION: u64 = 1_000;

fn fixture(total: u64) -> (SimChain, RewardProgram, ScenarioConfig) {
    let total = U256::from(total);
    let end = START + DURATION;
    let entries = build_schedule(
        &[EmissionTarget {
            asset: ASSET,
            total_amount: total,
        }],
        DURATION,
        end,
        total,
        RATE_WIDTH_BITS,
    )
    .unwrap();
    let program = RewardProgram {
        reward_asset: REWARD,
        reward_oracle: ORACLE,
        payer: ADMIN,
        transfer_authority: AUTHORITY,
        entries,
        distribution_end: end,
    };
    let mut chain = SimChain::new(START);
    chain.set_balance(WHALE, total * 2u8);
    let cfg = ScenarioConfig {
        admin: ADMIN,
        claimant: WHALE,
        funding_source: WHALE,
        claimed_assets: vec![ASSET],
        oracle_price: U256::from(100u8),
        program_total: total,
        funding_amount: total,
        accrual_secs: DURATION / 2,
        tolerance: total / 10u8,
        assertion: AssertionMode::AccruedProximity,
    };
    (chain, program, cfg)
}

#[test]
fn funded_run_claims_half_the_program() {
    let (mut chain, program, cfg) = fixture(1_000_000);
    let outcome = run_claim_scenario(&mut chain, &program, &cfg).unwrap();
    // Rate is exact here, so claimed == expected == total / 2.
    assert_eq!(outcome.claimed, U256::from(500_000u64));
    assert_eq!(outcome.expected_accrued, U256::from(500_000u64));
    assert_eq!(
        outcome.balance_after - outcome.balance_before,
        U256::from(500_000u64)
    );
}

#[test]
fn step_attribution_on_revert() {
    let (mut chain, program, mut cfg) = fixture(1_000_000);
    // Funding source cannot cover the requested liquidity.
    cfg.funding_amount = U256::from(10_000_000u64);
    let err = run_claim_scenario(&mut chain, &program, &cfg).unwrap_err();
    match err {
        ScenarioError::ExternalCallReverted { step, reason } => {
            assert_eq!(step, Step::FundPayer);
            assert!(reason.contains("exceeds balance"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unfunded_payer_makes_claim_revert() {
    let (mut chain, program, mut cfg) = fixture(1_000_000);
    cfg.funding_amount = U256::zero();
    let err = run_claim_scenario(&mut chain, &program, &cfg).unwrap_err();
    match err {
        ScenarioError::ExternalCallReverted { step, reason } => {
            assert_eq!(step, Step::Claim);
            assert!(reason.contains("payer balance"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn tolerance_failure_reports_raw_values() {
    let (mut chain, program, mut cfg) = fixture(1_000_000);
    // Balance proximity bounds the delta against zero, so a healthy accrual
    // of half the program blows a tight tolerance.
    cfg.assertion = AssertionMode::BalanceProximity;
    cfg.tolerance = U256::from(3u8);
    let err = run_claim_scenario(&mut chain, &program, &cfg).unwrap_err();
    match err {
        ScenarioError::ToleranceExceeded {
            observed,
            expected,
            tolerance,
        } => {
            assert_eq!(observed, U256::from(500_000u64));
            assert_eq!(expected, U256::zero());
            assert_eq!(tolerance, U256::from(3u8));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn accrual_stops_at_distribution_end() {
    let (mut chain, program, mut cfg) = fixture(1_000_000);
    // Advance far past the end; only the schedule window accrues.
    cfg.accrual_secs = DURATION * 10;
    cfg.tolerance = U256::zero();
    let outcome = run_claim_scenario(&mut chain, &program, &cfg).unwrap();
    assert_eq!(outcome.claimed, U256::from(1_000_000u64));
    assert_eq!(outcome.expected_accrued, U256::from(1_000_000u64));
}
