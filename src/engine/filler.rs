//! Writes report text into the dialog's text areas and verifies it landed.

use anyhow::{Result, bail};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::Timings;
use super::resolve::Resolver;
use crate::dom;
use crate::error::StageError;
use crate::page::Page;
use crate::selectors::SelectorTable;
use crate::types::{Report, ReportField};

/// Interchangeable ways of getting text into a field, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Technique {
    /// Native value setter plus synthetic input/change/blur events.
    ScriptAssign,
    /// Focus, select all, delete, type, tab out.
    Keystrokes,
}

pub const TECHNIQUES: [Technique; 2] = [Technique::ScriptAssign, Technique::Keystrokes];

#[derive(Debug, Default, Deserialize)]
struct Found {
    #[serde(default)]
    found: bool,
}

impl Technique {
    pub fn name(&self) -> &'static str {
        match self {
            Technique::ScriptAssign => "script-assign",
            Technique::Keystrokes => "keystrokes",
        }
    }

    pub fn apply<P: Page>(
        &self,
        page: &P,
        selectors: &SelectorTable,
        index: usize,
        value: &str,
    ) -> Result<()> {
        match self {
            Technique::ScriptAssign => {
                let script = dom::assign_field(selectors, index, value);
                let hit: Found = serde_json::from_value(page.evaluate(&script)?)?;
                if !hit.found {
                    bail!("field {index} not resolvable");
                }
            }
            Technique::Keystrokes => {
                // re-tag so the native click lands on the current node
                page.evaluate(&dom::resolve_fields(selectors))?;
                if let Err(e) = page.click(&dom::field_marker(index)) {
                    debug!(index, error = %e, "native focus click failed");
                }
                let script = dom::select_field(selectors, index);
                let hit: Found = serde_json::from_value(page.evaluate(&script)?)?;
                if !hit.found {
                    bail!("field {index} not resolvable");
                }
                page.press_key("Delete")?;
                page.type_str(value)?;
                page.press_key("Tab")?;
            }
        }
        Ok(())
    }
}

pub struct FieldFiller<'a, P: Page> {
    resolver: Resolver<'a, P>,
    floor: usize,
}

impl<'a, P: Page> FieldFiller<'a, P> {
    pub fn new(page: &'a P, selectors: &'a SelectorTable, floor: usize) -> Self {
        Self {
            resolver: Resolver::new(page, selectors),
            floor,
        }
    }

    /// Fill field `index` and return the best verified trimmed length.
    pub fn fill(&self, index: usize, field: ReportField, value: &str) -> usize {
        let mut best = 0;
        for technique in TECHNIQUES {
            if let Err(e) = technique.apply(
                self.resolver.page(),
                self.resolver.selectors(),
                index,
                value,
            ) {
                warn!(%field, technique = technique.name(), error = %e, "input technique failed");
                continue;
            }
            let length = self.resolver.field_length(index).unwrap_or(0);
            best = best.max(length);
            if length >= self.floor {
                debug!(%field, technique = technique.name(), length, "field verified");
                break;
            }
            warn!(
                %field,
                technique = technique.name(),
                length,
                floor = self.floor,
                "field below floor after input"
            );
        }
        best
    }
}

/// Fill the three report fields in form order. Every field is attempted;
/// the first one that stayed under the floor fails the stage.
pub fn fill_fields<P: Page>(
    page: &P,
    selectors: &SelectorTable,
    timings: &Timings,
    floor: usize,
    report: &Report,
) -> Result<(), StageError> {
    let expected = report.fields().len();
    if let Err(e) = page.wait_visible(&selectors.text_field, timings.field_wait) {
        debug!(error = %e, "text fields not visible yet");
    }
    let found = Resolver::new(page, selectors).report_fields();
    if found < expected {
        return Err(StageError::FieldsMissing { found, expected });
    }

    let filler = FieldFiller::new(page, selectors, floor);
    let lengths: Vec<(ReportField, usize)> = report
        .fields()
        .iter()
        .enumerate()
        .map(|(index, (field, value))| (*field, filler.fill(index, *field, value)))
        .collect();
    info!(?lengths, "report fields written");

    match lengths.into_iter().find(|(_, length)| *length < floor) {
        Some((field, length)) => Err(StageError::FieldFill {
            field,
            length,
            floor,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fake::{FakePortal, PortalSetup};

    fn report(len: usize) -> Report {
        Report::new("a".repeat(len), "b".repeat(len), "c".repeat(len))
    }

    #[test]
    fn script_assignment_that_verifies_skips_keystrokes() {
        let page = FakePortal::in_dialog(PortalSetup::happy());
        let selectors = SelectorTable::default();

        let length = FieldFiller::new(&page, &selectors, 100).fill(
            0,
            ReportField::Activity,
            &"x".repeat(180),
        );
        assert_eq!(length, 180);
        assert_eq!(page.count("field.select"), 0);
    }

    #[test]
    fn truncated_assignment_falls_back_to_keystrokes() {
        let mut setup = PortalSetup::happy();
        setup.assign_cap = Some(20);
        let page = FakePortal::in_dialog(setup);
        let selectors = SelectorTable::default();

        let length = FieldFiller::new(&page, &selectors, 100).fill(
            1,
            ReportField::Learning,
            &"y".repeat(220),
        );
        assert_eq!(length, 220);
        assert_eq!(page.count("field.select"), 1);
        assert_eq!(page.ops("press_key"), vec!["Delete", "Tab"]);
    }

    #[test]
    fn every_technique_reports_best_length() {
        let mut setup = PortalSetup::happy();
        setup.assign_cap = Some(60);
        setup.keystroke_cap = Some(30);
        let page = FakePortal::in_dialog(setup);
        let selectors = SelectorTable::default();

        let length = FieldFiller::new(&page, &selectors, 100).fill(
            2,
            ReportField::Obstacles,
            &"z".repeat(200),
        );
        assert_eq!(length, 60);
    }

    #[test]
    fn fill_fields_writes_all_three_in_order() {
        let page = FakePortal::in_dialog(PortalSetup::happy());
        let selectors = SelectorTable::default();
        let report = Report::new("a".repeat(150), "b".repeat(160), "c".repeat(170));

        fill_fields(&page, &selectors, &Timings::instant(), 100, &report).unwrap();
        assert_eq!(page.field_lengths(), vec![150, 160, 170]);
        assert_eq!(page.ops("field.assign"), vec!["0", "1", "2"]);
    }

    #[test]
    fn short_field_fails_stage_with_its_length() {
        let mut setup = PortalSetup::happy();
        setup.assign_cap = Some(40);
        setup.keystroke_cap = Some(40);
        let page = FakePortal::in_dialog(setup);
        let selectors = SelectorTable::default();

        let err =
            fill_fields(&page, &selectors, &Timings::instant(), 100, &report(200)).unwrap_err();
        assert!(matches!(
            err,
            StageError::FieldFill {
                field: ReportField::Activity,
                length: 40,
                floor: 100
            }
        ));
        // every field still gets both techniques
        assert_eq!(page.count("field.select"), 3);
    }

    #[test]
    fn too_few_text_areas_is_fields_missing() {
        let mut setup = PortalSetup::happy();
        setup.field_count = 2;
        let page = FakePortal::in_dialog(setup);
        let selectors = SelectorTable::default();

        let err =
            fill_fields(&page, &selectors, &Timings::instant(), 100, &report(200)).unwrap_err();
        assert!(matches!(
            err,
            StageError::FieldsMissing {
                found: 2,
                expected: 3
            }
        ));
        assert_eq!(page.count("field.assign"), 0);
    }
}
