// Property-based tests for emission invariants.
//
// Categories:
// 1. Idempotent sensor declaration: first pins win, one declaration
// 2. Bus selection: exactly one bus setup per init; unknown selectors act as hardware
// 3. Inline stream: no deduplication, call order preserved
// 4. Critical flags: only sensor begin and start ranging are critical
//
// Uses proptest with explicit configuration to prevent CI flakiness.

use proptest::prelude::*;
use tofgen::assembly::ProgramAssembly;
use tofgen::block::BlockInvocation;
use tofgen::blocks::{emit_block, BlockKind};
use tofgen::codegen::{codegen, CodegenOptions};
use tofgen::tof400c::{self, BusPins, InitParams};

// ── Test helpers ────────────────────────────────────────────────────────────

fn arb_pin() -> impl Strategy<Value = String> {
    "[AD]?[0-9]{1,2}"
}

fn init_with_selector(selector: &str) -> ProgramAssembly {
    let mut asm = ProgramAssembly::new();
    tof400c::init(
        &mut asm,
        &InitParams {
            xshut_pin: "3",
            irq_pin: "2",
            selector,
            address: "0x29",
            pins: BusPins {
                sda: "A4",
                scl: "A5",
            },
        },
    );
    asm
}

fn render(asm: &ProgramAssembly) -> String {
    codegen(asm, &CodegenOptions { header: false })
        .generated
        .sketch_source
}

fn default_block(kind: BlockKind) -> BlockInvocation {
    let mut block = BlockInvocation::new(kind.opcode());
    for p in kind.params() {
        block = block.with(p.name, p.default);
    }
    block
}

// ── 1-4. Generated invariants ──────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 100,
        max_shrink_iters: 200,
        .. ProptestConfig::default()
    })]

    #[test]
    fn sensor_declaration_is_idempotent(
        pins in prop::collection::vec((arb_pin(), arb_pin()), 1..8)
    ) {
        let mut asm = ProgramAssembly::new();
        for (xshut, irq) in &pins {
            tof400c::ensure_sensor_declared(&mut asm, xshut, irq);
        }
        prop_assert_eq!(asm.objects().len(), 1);
        prop_assert_eq!(asm.includes().len(), 1);
        let (xshut, irq) = &pins[0];
        prop_assert_eq!(
            &asm.objects()[0].declarator,
            &format!("tof400c({}, {});", xshut, irq)
        );
    }

    #[test]
    fn exactly_one_bus_per_init(selector in "[-+ ]?[0-9a-z]{0,3}") {
        let asm = init_with_selector(&selector);
        let hardware = asm.setup_statement(tof400c::HARDWARE_BUS_SETUP_KEY).is_some();
        let software = asm.object(tof400c::SOFT_WIRE_OBJ).is_some()
            && asm.setup_statement("tof400cSoftWire_begin").is_some();
        prop_assert!(hardware != software, "selector {:?}", selector);
    }

    #[test]
    fn non_software_selector_matches_hardware(n in any::<i64>().prop_filter("not the software sentinel", |n| *n != 1)) {
        let hardware = render(&init_with_selector("0"));
        prop_assert_eq!(render(&init_with_selector(&n.to_string())), hardware);
    }

    #[test]
    fn timing_budget_calls_are_kept_in_order(budgets in prop::collection::vec(0u16..1000, 1..10)) {
        let mut asm = ProgramAssembly::new();
        for b in &budgets {
            tof400c::set_timing_budget(&mut asm, &b.to_string());
        }
        let expected: Vec<String> = budgets
            .iter()
            .map(|b| format!("tof400c.setTimingBudget({});", b))
            .collect();
        let got: Vec<String> = asm.code().iter().map(|f| f.code().to_string()).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn only_begin_and_ranging_are_critical(
        kinds in prop::collection::vec(prop::sample::select(BlockKind::ALL.to_vec()), 1..12),
        software in any::<bool>(),
    ) {
        let mut asm = ProgramAssembly::new();
        for kind in &kinds {
            let mut block = default_block(*kind);
            if *kind == BlockKind::Init && software {
                block = block.with("I2C_SEL", "1");
            }
            emit_block(&mut asm, &block).unwrap();
        }
        for stmt in asm.setup() {
            let should_be_critical = stmt.key == tof400c::SENSOR_BEGIN_KEY
                || stmt.key == tof400c::START_RANGING_KEY;
            prop_assert_eq!(stmt.critical, should_be_critical, "key {}", stmt.key);
        }
        // One bus choice per pass: repeated identical inits add nothing.
        prop_assert!(asm.diagnostics().is_empty());
    }
}

// ── End-to-end scenario ─────────────────────────────────────────────────────

#[test]
fn software_bus_scenario_sections() {
    let mut asm = ProgramAssembly::new();
    let blocks = [
        BlockInvocation::new("init")
            .with("XPIN", "3")
            .with("IPIN", "2")
            .with("I2C_SEL", "1")
            .with("ADDR", "0x29")
            .with("SDA_PIN", "A4")
            .with("SCL_PIN", "A5"),
        BlockInvocation::new("setTimingBudget").with("BUDGET", "50"),
        BlockInvocation::new("startRanging"),
    ];
    for block in &blocks {
        emit_block(&mut asm, block).unwrap();
    }

    let includes: Vec<&str> = asm.includes().iter().map(|i| i.text.as_str()).collect();
    assert_eq!(
        includes,
        ["#include <SoftWire.h>", "#include \"Adafruit_VL53L1X.h\""]
    );

    let objects: Vec<String> = asm.objects().iter().map(|o| o.text()).collect();
    assert_eq!(
        objects,
        [
            "SoftWire tof400cSoftWire(A4, A5);",
            "Adafruit_VL53L1X tof400c(3, 2);"
        ]
    );

    let setup: Vec<(&str, bool)> = asm
        .setup()
        .iter()
        .map(|s| (s.code.as_str(), s.critical))
        .collect();
    assert_eq!(
        setup,
        [
            ("tof400cSoftWire.begin();", false),
            (
                "if (!tof400c.begin(0x29, &tof400cSoftWire)) { while (1) delay(10); }",
                true
            ),
            ("if (!tof400c.startRanging()) { while (1) delay(10); }", true),
        ]
    );

    let code: Vec<&str> = asm.code().iter().map(|f| f.code()).collect();
    assert_eq!(code, ["tof400c.setTimingBudget(50);"]);
}

#[test]
fn selector_two_renders_like_selector_zero() {
    assert_eq!(
        render(&init_with_selector("2")),
        render(&init_with_selector("0"))
    );
}
