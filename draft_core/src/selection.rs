use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

const SELECTION_TARGET: &str = "slice_draft::selection";

/// Identifier for a participant making draft selections.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub u32);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One axis of choice with its candidate items and each actor's current claim.
#[derive(Debug, Clone)]
pub struct SelectionCategory<I> {
    name: String,
    items: Vec<(I, String)>,
    claims: BTreeMap<ActorId, I>,
}

impl<I: Clone + PartialEq> SelectionCategory<I> {
    fn new(name: String, items: Vec<(I, String)>) -> Self {
        Self {
            name,
            items,
            claims: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Candidate items with their display labels, in registration order.
    pub fn items(&self) -> &[(I, String)] {
        &self.items
    }

    pub fn label_of(&self, item: &I) -> Option<&str> {
        self.items
            .iter()
            .find(|(candidate, _)| candidate == item)
            .map(|(_, label)| label.as_str())
    }

    pub fn contains(&self, item: &I) -> bool {
        self.items.iter().any(|(candidate, _)| candidate == item)
    }

    pub fn claim_of(&self, actor: ActorId) -> Option<&I> {
        self.claims.get(&actor)
    }

    pub fn claims(&self) -> impl Iterator<Item = (ActorId, &I)> {
        self.claims.iter().map(|(actor, item)| (*actor, item))
    }

    /// Actors currently holding `item`, in actor order.
    pub fn claimants(&self, item: &I) -> Vec<ActorId> {
        self.claims
            .iter()
            .filter(|(_, claimed)| *claimed == item)
            .map(|(actor, _)| *actor)
            .collect()
    }

    /// Items held by more than one actor, in item registration order.
    pub fn collisions(&self) -> Vec<(I, Vec<ActorId>)> {
        self.items
            .iter()
            .filter_map(|(item, _)| {
                let holders = self.claimants(item);
                (holders.len() > 1).then(|| (item.clone(), holders))
            })
            .collect()
    }
}

/// All categories of one draft session, in registration order.
#[derive(Debug, Clone)]
pub struct DraftState<I> {
    categories: Vec<SelectionCategory<I>>,
}

impl<I> Default for DraftState<I> {
    fn default() -> Self {
        Self {
            categories: Vec::new(),
        }
    }
}

impl<I: Clone + PartialEq> DraftState<I> {
    pub fn category(&self, name: &str) -> Option<&SelectionCategory<I>> {
        self.categories.iter().find(|category| category.name == name)
    }

    /// Categories are fixed by the caller, so an unknown name is a bug.
    fn registered_mut(&mut self, name: &str) -> &mut SelectionCategory<I> {
        match self
            .categories
            .iter_mut()
            .find(|category| category.name == name)
        {
            Some(category) => category,
            None => panic!("category '{}' is not registered", name),
        }
    }

    pub fn categories(&self) -> impl Iterator<Item = &SelectionCategory<I>> {
        self.categories.iter()
    }

    /// True when `actor` holds a claim in every registered category.
    pub fn is_ready(&self, actor: ActorId) -> bool {
        !self.categories.is_empty()
            && self
                .categories
                .iter()
                .all(|category| category.claims.contains_key(&actor))
    }
}

/// Mutation just applied to a [`DraftState`].
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionChange<I> {
    Claimed {
        category: String,
        actor: ActorId,
        item: I,
        previous: Option<I>,
    },
    Released {
        category: String,
        actor: ActorId,
        item: I,
    },
    ItemsReplaced {
        category: String,
    },
    Reset,
}

/// Refresh hook run synchronously after every mutation. Observers only see a
/// shared borrow of the state, so they cannot claim from inside the callback.
pub trait SelectionObserver<I> {
    fn refresh(&mut self, state: &DraftState<I>, change: &SelectionChange<I>);
}

impl<I, F> SelectionObserver<I> for F
where
    F: FnMut(&DraftState<I>, &SelectionChange<I>),
{
    fn refresh(&mut self, state: &DraftState<I>, change: &SelectionChange<I>) {
        self(state, change)
    }
}

/// Turn-order collaborator told when an actor has finished a sequential pick.
pub trait TurnAdvance {
    fn advance_after(&mut self, actor: ActorId);
}

impl<F> TurnAdvance for F
where
    F: FnMut(ActorId),
{
    fn advance_after(&mut self, actor: ActorId) {
        self(actor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimMode {
    /// Every actor may claim at any time.
    #[default]
    Simultaneous,
    /// Each successful claim also signals the turn-order collaborator.
    Sequential,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimOutcome<I> {
    /// Claim replaced by this one, if the actor already held one.
    pub previous: Option<I>,
    /// Whether the actor now holds a claim in every category.
    pub ready: bool,
}

/// Rejected actor input. Misuse of categories panics instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("item {item} is not a candidate in category '{category}'")]
    UnknownItem { category: String, item: String },
}

/// Tracks at most one claim per actor per category.
///
/// Several actors may hold the same item; exclusivity is per actor. Commit
/// logic decides what to do with collisions.
pub struct SelectionArbiter<I> {
    state: DraftState<I>,
    mode: ClaimMode,
    observers: Vec<Box<dyn SelectionObserver<I>>>,
    turns: Option<Box<dyn TurnAdvance>>,
}

impl<I: fmt::Debug> fmt::Debug for SelectionArbiter<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionArbiter")
            .field("state", &self.state)
            .field("mode", &self.mode)
            .field("observers", &self.observers.len())
            .field("turns", &self.turns.is_some())
            .finish()
    }
}

impl<I: Clone + PartialEq + fmt::Debug> SelectionArbiter<I> {
    pub fn new(mode: ClaimMode) -> Self {
        Self {
            state: DraftState::default(),
            mode,
            observers: Vec::new(),
            turns: None,
        }
    }

    pub fn with_turn_advance(mut self, turns: Box<dyn TurnAdvance>) -> Self {
        self.turns = Some(turns);
        self
    }

    pub fn add_observer(&mut self, observer: Box<dyn SelectionObserver<I>>) {
        self.observers.push(observer);
    }

    pub fn mode(&self) -> ClaimMode {
        self.mode
    }

    pub fn state(&self) -> &DraftState<I> {
        &self.state
    }

    pub fn categories(&self) -> impl Iterator<Item = &SelectionCategory<I>> {
        self.state.categories()
    }

    pub fn category(&self, name: &str) -> Option<&SelectionCategory<I>> {
        self.state.category(name)
    }

    /// # Panics
    /// If a category named `name` is already registered.
    pub fn register_category(&mut self, name: impl Into<String>, items: Vec<(I, String)>) {
        let name = name.into();
        assert!(
            self.state.category(&name).is_none(),
            "category '{}' is already registered",
            name
        );
        tracing::debug!(
            target: SELECTION_TARGET,
            category = %name,
            items = items.len(),
            "selection.category.registered"
        );
        self.state
            .categories
            .push(SelectionCategory::new(name, items));
    }

    /// Swap the candidate list of a category, dropping its claims.
    pub fn replace_items(&mut self, category: &str, items: Vec<(I, String)>) {
        let entry = self.state.registered_mut(category);
        entry.items = items;
        entry.claims.clear();
        tracing::debug!(
            target: SELECTION_TARGET,
            category,
            items = entry.items.len(),
            "selection.category.replaced"
        );
        self.notify(SelectionChange::ItemsReplaced {
            category: category.to_string(),
        });
    }

    /// Record `item` as the actor's claim in `category`, replacing any earlier
    /// claim. Observers run before this returns.
    pub fn claim(
        &mut self,
        category: &str,
        actor: ActorId,
        item: I,
    ) -> Result<ClaimOutcome<I>, SelectionError> {
        let entry = self.state.registered_mut(category);
        if !entry.contains(&item) {
            return Err(SelectionError::UnknownItem {
                category: category.to_string(),
                item: format!("{:?}", item),
            });
        }
        let previous = entry.claims.insert(actor, item.clone());
        let ready = self.state.is_ready(actor);

        tracing::debug!(
            target: SELECTION_TARGET,
            category,
            actor = %actor,
            item = ?item,
            replaced = previous.is_some(),
            ready,
            "selection.claimed"
        );

        self.notify(SelectionChange::Claimed {
            category: category.to_string(),
            actor,
            item,
            previous: previous.clone(),
        });
        if self.mode == ClaimMode::Sequential {
            if let Some(turns) = self.turns.as_mut() {
                turns.advance_after(actor);
            }
        }
        Ok(ClaimOutcome { previous, ready })
    }

    /// Drop the actor's claim in `category`, returning it if one was held.
    pub fn release(&mut self, category: &str, actor: ActorId) -> Option<I> {
        let entry = self.state.registered_mut(category);
        let released = entry.claims.remove(&actor);
        if let Some(item) = released.clone() {
            tracing::debug!(
                target: SELECTION_TARGET,
                category,
                actor = %actor,
                item = ?item,
                "selection.released"
            );
            self.notify(SelectionChange::Released {
                category: category.to_string(),
                actor,
                item,
            });
        }
        released
    }

    pub fn current_claim(&self, category: &str, actor: ActorId) -> Option<&I> {
        self.state
            .category(category)
            .and_then(|entry| entry.claim_of(actor))
    }

    pub fn ready_to_commit(&self, actor: ActorId) -> bool {
        self.state.is_ready(actor)
    }

    /// Actors currently holding `item`, or nobody for an unknown category.
    pub fn claimants(&self, category: &str, item: &I) -> Vec<ActorId> {
        self.state
            .category(category)
            .map(|entry| entry.claimants(item))
            .unwrap_or_default()
    }

    /// Every claim the actor holds, in category registration order.
    pub fn claims_by_actor(&self, actor: ActorId) -> Vec<(&str, &I)> {
        self.state
            .categories()
            .filter_map(|entry| entry.claim_of(actor).map(|item| (entry.name(), item)))
            .collect()
    }

    /// Clear every claim while keeping the registered categories.
    pub fn reset(&mut self) {
        for entry in &mut self.state.categories {
            entry.claims.clear();
        }
        tracing::debug!(target: SELECTION_TARGET, "selection.reset");
        self.notify(SelectionChange::Reset);
    }

    fn notify(&mut self, change: SelectionChange<I>) {
        for observer in &mut self.observers {
            observer.refresh(&self.state, &change);
        }
    }
}
