use super::extruder::ExtruderPlan;
use super::feature::FeatureExtrusion;
use super::layer::LayerPlan;
use super::moves::{ExtruderChange, ExtrusionMove, TravelMove, TravelRoute};
use super::sequence::ContinuousExtruderMoveSequence;
use super::SearchOrder;

///Named search depths: `FULL` walks the whole subtree,
///`DIRECT_CHILDREN` stays on the first level.
pub mod search_depth {
    pub const FULL: Option<usize> = None;
    pub const DIRECT_CHILDREN: Option<usize> = Some(0);
}

///A borrowed view of any non-root operation in the plan tree.
#[derive(Clone, Copy)]
pub enum OperationRef<'a> {
    LayerPlan(&'a LayerPlan),
    ExtruderPlan(&'a ExtruderPlan),
    ExtruderChange(&'a ExtruderChange),
    FeatureExtrusion(&'a FeatureExtrusion),
    Sequence(&'a ContinuousExtruderMoveSequence),
    TravelRoute(&'a TravelRoute),
    ExtrusionMove(&'a ExtrusionMove),
    TravelMove(&'a TravelMove),
}

impl<'a> OperationRef<'a> {
    fn children(self) -> Vec<OperationRef<'a>> {
        match self {
            OperationRef::LayerPlan(layer) => layer.child_refs(),
            OperationRef::ExtruderPlan(plan) => plan.child_refs(),
            OperationRef::FeatureExtrusion(feature) => feature.child_refs(),
            OperationRef::Sequence(sequence) => sequence.child_refs(),
            OperationRef::TravelRoute(route) => route.child_refs(),
            OperationRef::ExtruderChange(_)
            | OperationRef::ExtrusionMove(_)
            | OperationRef::TravelMove(_) => Vec::new(),
        }
    }
}

///A mutably borrowed view of any non-root operation in the plan tree.
pub enum OperationMut<'a> {
    LayerPlan(&'a mut LayerPlan),
    ExtruderPlan(&'a mut ExtruderPlan),
    ExtruderChange(&'a mut ExtruderChange),
    FeatureExtrusion(&'a mut FeatureExtrusion),
    Sequence(&'a mut ContinuousExtruderMoveSequence),
    TravelRoute(&'a mut TravelRoute),
    ExtrusionMove(&'a mut ExtrusionMove),
    TravelMove(&'a mut TravelMove),
}

///The is-a test of the typed-search API: each node type knows which view
///variant it is.
pub trait PrintOperation: Sized {
    fn from_ref<'a>(operation: OperationRef<'a>) -> Option<&'a Self>;

    fn from_mut<'a>(operation: OperationMut<'a>) -> Option<&'a mut Self>;
}

macro_rules! impl_print_operation {
    ($operation:ty, $variant:ident) => {
        impl PrintOperation for $operation {
            fn from_ref<'a>(operation: OperationRef<'a>) -> Option<&'a Self> {
                match operation {
                    OperationRef::$variant(operation) => Some(operation),
                    _ => None,
                }
            }

            fn from_mut<'a>(operation: OperationMut<'a>) -> Option<&'a mut Self> {
                match operation {
                    OperationMut::$variant(operation) => Some(operation),
                    _ => None,
                }
            }
        }
    };
}

impl_print_operation!(LayerPlan, LayerPlan);
impl_print_operation!(ExtruderPlan, ExtruderPlan);
impl_print_operation!(ExtruderChange, ExtruderChange);
impl_print_operation!(FeatureExtrusion, FeatureExtrusion);
impl_print_operation!(ContinuousExtruderMoveSequence, Sequence);
impl_print_operation!(TravelRoute, TravelRoute);
impl_print_operation!(ExtrusionMove, ExtrusionMove);
impl_print_operation!(TravelMove, TravelMove);

///A tree transformation applied to every visited node of one static type.
pub trait PrintOperationTransformer<T> {
    fn process(&mut self, operation: &mut T);
}

///Typed search and transformation over a sequence's children. A depth of
///`Some(0)` looks at direct children only, `None` searches the full
///subtree; searches visit each node once, depth first, in the given
///order.
pub trait PrintOperationSequence {
    fn child_refs(&self) -> Vec<OperationRef<'_>>;

    fn child_muts(&mut self) -> Vec<OperationMut<'_>>;

    ///The first descendant of type `T` accepted by the predicate.
    fn find_by_type<T, F>(
        &self,
        order: SearchOrder,
        max_depth: Option<usize>,
        predicate: F,
    ) -> Option<&T>
    where
        T: PrintOperation,
        F: Fn(&T) -> bool,
    {
        find_in(self.child_refs(), order, max_depth, &predicate)
    }

    ///All descendants of type `T`, in visiting order.
    fn find_all_by_type<T: PrintOperation>(
        &self,
        order: SearchOrder,
        max_depth: Option<usize>,
    ) -> Vec<&T> {
        let mut found = Vec::new();
        collect_in(self.child_refs(), order, max_depth, &mut found);
        found
    }

    ///Depth-first recursion over the subtree, invoking the transformer on
    ///every node of type `T`. Children of a node are transformed before
    ///the node itself.
    fn apply_processors_recursively<T, P>(&mut self, processor: &mut P)
    where
        T: PrintOperation,
        P: PrintOperationTransformer<T>,
    {
        for child in self.child_muts() {
            apply_recursively(child, processor);
        }
    }
}

fn find_in<'a, T, F>(
    children: Vec<OperationRef<'a>>,
    order: SearchOrder,
    max_depth: Option<usize>,
    predicate: &F,
) -> Option<&'a T>
where
    T: PrintOperation,
    F: Fn(&T) -> bool,
{
    let visit = |child: OperationRef<'a>| -> Option<&'a T> {
        if let Some(target) = T::from_ref(child) {
            if predicate(target) {
                return Some(target);
            }
        }
        let next_depth = match max_depth {
            Some(0) => return None,
            Some(depth) => Some(depth - 1),
            None => None,
        };
        find_in(child.children(), order, next_depth, predicate)
    };

    match order {
        SearchOrder::Forward => children.into_iter().find_map(visit),
        SearchOrder::Backward => children.into_iter().rev().find_map(visit),
    }
}

fn collect_in<'a, T>(
    children: Vec<OperationRef<'a>>,
    order: SearchOrder,
    max_depth: Option<usize>,
    found: &mut Vec<&'a T>,
) where
    T: PrintOperation,
{
    let visit = |found: &mut Vec<&'a T>, child: OperationRef<'a>| {
        if let Some(target) = T::from_ref(child) {
            found.push(target);
        }
        match max_depth {
            Some(0) => {}
            Some(depth) => collect_in(child.children(), order, Some(depth - 1), found),
            None => collect_in(child.children(), order, None, found),
        }
    };

    match order {
        SearchOrder::Forward => {
            for child in children {
                visit(found, child);
            }
        }
        SearchOrder::Backward => {
            for child in children.into_iter().rev() {
                visit(found, child);
            }
        }
    }
}

fn apply_recursively<T, P>(operation: OperationMut<'_>, processor: &mut P)
where
    T: PrintOperation,
    P: PrintOperationTransformer<T>,
{
    match operation {
        OperationMut::LayerPlan(layer) => {
            for child in layer.child_muts() {
                apply_recursively(child, processor);
            }
            if let Some(target) = T::from_mut(OperationMut::LayerPlan(layer)) {
                processor.process(target);
            }
        }
        OperationMut::ExtruderPlan(plan) => {
            for child in plan.child_muts() {
                apply_recursively(child, processor);
            }
            if let Some(target) = T::from_mut(OperationMut::ExtruderPlan(plan)) {
                processor.process(target);
            }
        }
        OperationMut::FeatureExtrusion(feature) => {
            for child in feature.child_muts() {
                apply_recursively(child, processor);
            }
            if let Some(target) = T::from_mut(OperationMut::FeatureExtrusion(feature)) {
                processor.process(target);
            }
        }
        OperationMut::Sequence(sequence) => {
            for child in sequence.child_muts() {
                apply_recursively(child, processor);
            }
            if let Some(target) = T::from_mut(OperationMut::Sequence(sequence)) {
                processor.process(target);
            }
        }
        OperationMut::TravelRoute(route) => {
            for child in route.child_muts() {
                apply_recursively(child, processor);
            }
            if let Some(target) = T::from_mut(OperationMut::TravelRoute(route)) {
                processor.process(target);
            }
        }
        leaf @ (OperationMut::ExtruderChange(_)
        | OperationMut::ExtrusionMove(_)
        | OperationMut::TravelMove(_)) => {
            if let Some(target) = T::from_mut(leaf) {
                processor.process(target);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point3, Velocity};
    use crate::plan::{FeatureKind, PathConfigStorage, PrintFeatureType, PrintPlan};
    use std::sync::Arc;

    fn line_sequence(y: i64) -> ContinuousExtruderMoveSequence {
        let mut sequence = ContinuousExtruderMoveSequence::open(Point3::new(0, y, 0));
        sequence.append_extrusion_move(ExtrusionMove::new(
            Point3::new(10_000, y, 0),
            400,
            Velocity(30.0),
        ));
        sequence
    }

    fn two_layer_plan() -> PrintPlan {
        let configs = Arc::new(PathConfigStorage::default());
        let mut plan = PrintPlan::new();

        for (layer_index, extruders) in [(0_usize, vec![0_u8, 1]), (1, vec![1])] {
            let mut layer =
                LayerPlan::new(layer_index, 200 * (layer_index as i64 + 1), 200, configs.clone());
            for extruder_nr in extruders {
                let mut feature = FeatureExtrusion::new(
                    PrintFeatureType::OuterWall,
                    400,
                    FeatureKind::Plain,
                );
                feature.append_sequence(line_sequence(extruder_nr as i64 * 1_000));
                let mut extruder_plan = ExtruderPlan::new(extruder_nr);
                extruder_plan.append_feature(feature);
                layer.append_extruder_plan(extruder_plan, false);
            }
            plan.append_layer(layer);
        }

        plan
    }

    #[test]
    fn search_order_picks_first_or_last() {
        let plan = two_layer_plan();

        let first = plan
            .find_by_type::<ExtruderPlan, _>(SearchOrder::Forward, search_depth::FULL, |_| true)
            .unwrap();
        let last = plan
            .find_by_type::<ExtruderPlan, _>(SearchOrder::Backward, search_depth::FULL, |_| true)
            .unwrap();
        assert_eq!(first.extruder_nr(), 0);
        assert_eq!(last.extruder_nr(), 1);
    }

    #[test]
    fn depth_zero_only_sees_direct_children() {
        let plan = two_layer_plan();

        // The print plan's direct children are layer plans only.
        assert!(plan
            .find_by_type::<ExtruderPlan, _>(
                SearchOrder::Forward,
                search_depth::DIRECT_CHILDREN,
                |_| true
            )
            .is_none());
        assert!(plan
            .find_by_type::<LayerPlan, _>(
                SearchOrder::Forward,
                search_depth::DIRECT_CHILDREN,
                |_| true
            )
            .is_some());

        // One level further down the extruder plans appear.
        assert!(plan
            .find_by_type::<ExtruderPlan, _>(SearchOrder::Forward, Some(1), |_| true)
            .is_some());
    }

    #[test]
    fn predicate_narrows_the_search() {
        let plan = two_layer_plan();
        let second_extruder = plan
            .find_by_type::<ExtruderPlan, _>(SearchOrder::Forward, search_depth::FULL, |found| {
                found.extruder_nr() == 1
            })
            .unwrap();
        assert_eq!(second_extruder.extruder_nr(), 1);
    }

    #[test]
    fn find_all_collects_every_match_once() {
        let plan = two_layer_plan();

        let sequences = plan.find_all_by_type::<ContinuousExtruderMoveSequence>(
            SearchOrder::Forward,
            search_depth::FULL,
        );
        assert_eq!(sequences.len(), 3);

        let extruder_plans =
            plan.find_all_by_type::<ExtruderPlan>(SearchOrder::Forward, Some(1));
        assert_eq!(extruder_plans.len(), 3);
    }

    ///Raises the Z offset of every sequence it visits.
    struct RaiseSequences {
        z_offset: i64,
    }

    impl PrintOperationTransformer<ContinuousExtruderMoveSequence> for RaiseSequences {
        fn process(&mut self, sequence: &mut ContinuousExtruderMoveSequence) {
            sequence.set_z_offset(self.z_offset);
        }
    }

    #[test]
    fn transformer_reaches_every_node_of_its_type() {
        let mut plan = two_layer_plan();
        plan.apply_processors_recursively(&mut RaiseSequences { z_offset: 40 });

        let sequences = plan.find_all_by_type::<ContinuousExtruderMoveSequence>(
            SearchOrder::Forward,
            search_depth::FULL,
        );
        assert!(sequences
            .iter()
            .all(|sequence| sequence.z_offset() == 40));
    }
}
