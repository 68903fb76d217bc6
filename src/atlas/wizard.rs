//! Multi-step travel wizard: collects destination, companion/NPC, and
//! activity choices, then assembles one travel instruction sentence and
//! hands it to the host command sink. Holds no persisted state; finalizing
//! resets it to the initial empty values.

use crate::atlas::errors::AtlasError;

/// Fire-and-forget sink for the finalized instruction, supplied by the host.
pub trait CommandSink {
    fn dispatch(&self, command: &str);
}

/// Activities offered before the freeform input.
pub const PRESET_ACTIVITIES: &[&str] = &["闲逛", "吃饭", "喝酒", "看电影", "散步"];

/// Wizard steps, in flow order. The companion-name entry is optional:
/// choosing to go alone skips it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WizardStep {
    #[default]
    SelectDestination,
    SelectCompanionOrNpc,
    EnterCompanionName,
    SelectActivity,
}

/// Transient wizard state. Never persisted.
#[derive(Debug, Default)]
pub struct TravelWizard {
    step: WizardStep,
    destination: String,
    is_alone: bool,
    companion_name: String,
    meet_npc: bool,
    meet_npc_name: String,
}

impl TravelWizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    /// Record the destination and advance. An empty destination is rejected
    /// and the state left unchanged. Re-entering a destination from a later
    /// step restarts the flow from the companion choice, which is how the
    /// back button behaves.
    pub fn set_destination(&mut self, destination: &str) -> Result<(), AtlasError> {
        let destination = destination.trim();
        if destination.is_empty() {
            return Err(AtlasError::InvalidInput(
                "destination must not be empty".to_string(),
            ));
        }
        self.destination = destination.to_string();
        self.step = WizardStep::SelectCompanionOrNpc;
        Ok(())
    }

    /// Toggle the NPC encounter. Legal at any point before finalization and
    /// never changes the current step.
    pub fn set_meet_npc(&mut self, meet: bool, name: &str) {
        self.meet_npc = meet;
        self.meet_npc_name = name.trim().to_string();
    }

    /// Go alone: skips companion-name entry entirely.
    pub fn choose_alone(&mut self) -> Result<(), AtlasError> {
        self.require_step(&[
            WizardStep::SelectCompanionOrNpc,
            WizardStep::EnterCompanionName,
        ])?;
        self.is_alone = true;
        self.companion_name.clear();
        self.step = WizardStep::SelectActivity;
        Ok(())
    }

    /// Move from the companion choice to the name-entry step.
    pub fn begin_companion_entry(&mut self) -> Result<(), AtlasError> {
        self.require_step(&[WizardStep::SelectCompanionOrNpc])?;
        self.step = WizardStep::EnterCompanionName;
        Ok(())
    }

    /// Record a companion and advance. An empty name is rejected with the
    /// state unchanged.
    pub fn set_companion_name(&mut self, name: &str) -> Result<(), AtlasError> {
        self.require_step(&[
            WizardStep::SelectCompanionOrNpc,
            WizardStep::EnterCompanionName,
        ])?;
        let name = name.trim();
        if name.is_empty() {
            return Err(AtlasError::InvalidInput(
                "companion name must not be empty".to_string(),
            ));
        }
        self.is_alone = false;
        self.companion_name = name.to_string();
        self.step = WizardStep::SelectActivity;
        Ok(())
    }

    /// Assemble the instruction sentence, hand it to the sink, and reset.
    /// Preset and freeform activities are treated identically; an empty
    /// activity is rejected with the state unchanged.
    pub fn finalize(
        &mut self,
        activity: &str,
        sink: &dyn CommandSink,
    ) -> Result<String, AtlasError> {
        self.require_step(&[WizardStep::SelectActivity])?;
        let activity = activity.trim();
        if activity.is_empty() {
            return Err(AtlasError::InvalidInput(
                "activity must not be empty".to_string(),
            ));
        }
        let text = self.compose(activity);
        sink.dispatch(&text);
        *self = Self::default();
        Ok(text)
    }

    /// Sentence order: actor placeholder, solo-or-companion clause, optional
    /// NPC-encounter clause, activity clause.
    fn compose(&self, activity: &str) -> String {
        let mut text = if self.is_alone {
            format!("{{{{user}}}} 决定独自前往 {}", self.destination)
        } else {
            format!(
                "{{{{user}}}} 邀请 {} 前往 {}",
                self.companion_name, self.destination
            )
        };
        if self.meet_npc && !self.meet_npc_name.is_empty() {
            text.push_str("，并在那里遇见 ");
            text.push_str(&self.meet_npc_name);
        }
        text.push_str("。活动内容：");
        text.push_str(activity);
        text.push('。');
        text
    }

    fn require_step(&self, allowed: &[WizardStep]) -> Result<(), AtlasError> {
        if allowed.contains(&self.step) {
            Ok(())
        } else {
            Err(AtlasError::InvalidInput(format!(
                "wizard step {:?} does not accept this choice",
                self.step
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingSink {
        sent: RefCell<Vec<String>>,
    }

    impl CommandSink for RecordingSink {
        fn dispatch(&self, command: &str) {
            self.sent.borrow_mut().push(command.to_string());
        }
    }

    #[test]
    fn solo_travel_sentence() {
        let mut wizard = TravelWizard::new();
        let sink = RecordingSink::default();
        wizard.set_destination("海边").expect("destination");
        wizard.set_meet_npc(false, "");
        wizard.choose_alone().expect("alone");
        let text = wizard.finalize("闲逛", &sink).expect("finalize");
        assert_eq!(text, "{{user}} 决定独自前往 海边。活动内容：闲逛。");
        assert_eq!(sink.sent.borrow().as_slice(), [text]);
    }

    #[test]
    fn companion_travel_with_npc_sentence() {
        let mut wizard = TravelWizard::new();
        let sink = RecordingSink::default();
        wizard.set_destination("咖啡馆").expect("destination");
        wizard.set_meet_npc(true, "老王");
        wizard.begin_companion_entry().expect("enter name");
        wizard.set_companion_name("小明").expect("companion");
        let text = wizard.finalize("喝酒", &sink).expect("finalize");
        assert_eq!(
            text,
            "{{user}} 邀请 小明 前往 咖啡馆，并在那里遇见 老王。活动内容：喝酒。"
        );
    }

    #[test]
    fn npc_clause_needs_both_flag_and_name() {
        let sink = RecordingSink::default();
        // Flag set but name empty: clause omitted.
        let mut wizard = TravelWizard::new();
        wizard.set_destination("公园").expect("destination");
        wizard.set_meet_npc(true, "  ");
        wizard.choose_alone().expect("alone");
        let text = wizard.finalize("散步", &sink).expect("finalize");
        assert_eq!(text, "{{user}} 决定独自前往 公园。活动内容：散步。");

        // Name set but flag off: clause omitted.
        let mut wizard = TravelWizard::new();
        wizard.set_destination("公园").expect("destination");
        wizard.set_meet_npc(false, "老王");
        wizard.choose_alone().expect("alone");
        let text = wizard.finalize("散步", &sink).expect("finalize");
        assert_eq!(text, "{{user}} 决定独自前往 公园。活动内容：散步。");
    }

    #[test]
    fn empty_inputs_are_rejected_without_state_change() {
        let mut wizard = TravelWizard::new();
        assert!(wizard.set_destination("  ").is_err());
        assert_eq!(wizard.step(), WizardStep::SelectDestination);

        wizard.set_destination("海边").expect("destination");
        assert!(wizard.set_companion_name("").is_err());
        assert_eq!(wizard.step(), WizardStep::SelectCompanionOrNpc);

        wizard.choose_alone().expect("alone");
        let sink = RecordingSink::default();
        assert!(wizard.finalize("", &sink).is_err());
        assert_eq!(wizard.step(), WizardStep::SelectActivity);
        assert!(sink.sent.borrow().is_empty());
    }

    #[test]
    fn finalize_resets_to_initial_state() {
        let mut wizard = TravelWizard::new();
        let sink = RecordingSink::default();
        wizard.set_destination("海边").expect("destination");
        wizard.set_meet_npc(true, "老王");
        wizard.choose_alone().expect("alone");
        let _ = wizard.finalize("闲逛", &sink).expect("finalize");

        assert_eq!(wizard.step(), WizardStep::SelectDestination);
        // A fresh run does not inherit the previous NPC toggle.
        wizard.set_destination("公园").expect("destination");
        wizard.choose_alone().expect("alone");
        let text = wizard.finalize("散步", &sink).expect("finalize");
        assert_eq!(text, "{{user}} 决定独自前往 公园。活动内容：散步。");
    }

    #[test]
    fn steps_enforce_flow_order() {
        let mut wizard = TravelWizard::new();
        let sink = RecordingSink::default();
        assert!(wizard.choose_alone().is_err());
        assert!(wizard.finalize("闲逛", &sink).is_err());

        // Re-entering a destination from a later step restarts the flow.
        wizard.set_destination("海边").expect("destination");
        wizard.choose_alone().expect("alone");
        wizard.set_destination("公园").expect("re-enter");
        assert_eq!(wizard.step(), WizardStep::SelectCompanionOrNpc);
    }

    #[test]
    fn preset_and_freeform_activities_are_equivalent() {
        let sink = RecordingSink::default();
        for activity in [PRESET_ACTIVITIES[0], "放风筝"] {
            let mut wizard = TravelWizard::new();
            wizard.set_destination("海边").expect("destination");
            wizard.choose_alone().expect("alone");
            let text = wizard.finalize(activity, &sink).expect("finalize");
            assert!(text.ends_with(&format!("活动内容：{activity}。")));
        }
    }
}
