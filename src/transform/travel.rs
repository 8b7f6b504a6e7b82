use crate::geometry::{Point3, SpeedDerivatives};
use crate::plan::{
    ExtruderOperation, ExtruderPlan, FeatureOperation, LayerOperation, PrintFeatureType,
    PrintPlan, TravelMove, TravelRoute,
};
use crate::settings::Settings;

///A travel between two positions, or nothing when they coincide. The
///route carries both endpoints.
fn make_travel_route(
    start: Point3,
    end: Point3,
    speed: SpeedDerivatives,
) -> Option<TravelRoute> {
    if start == end {
        return None;
    }
    let mut route = TravelRoute::new(PrintFeatureType::MoveCombing, speed);
    route.append(TravelMove::new(start));
    route.append(TravelMove::new(end));
    Some(route)
}

///Walks the plan and inserts travel routes wherever consecutive work ends
///and restarts at different positions. Gaps between extruder plans of
///different extruders are left alone; the extruder-change appender owns
///those.
pub struct TravelMovesInserter;

impl TravelMovesInserter {
    pub fn process(print_plan: &mut PrintPlan, settings: &Settings) {
        let speedup_layer_count = settings.speed_slowdown_layers;

        for layer in print_plan.layers_mut() {
            let layer_index = layer.layer_index();

            // Travels inside each extruder plan first.
            for extruder_plan in layer.extruder_plans_mut() {
                let speed = travel_speed(
                    settings,
                    layer_index,
                    speedup_layer_count,
                    extruder_plan.extruder_nr(),
                );
                Self::append_travels_in_extruder_plan(extruder_plan, speed);
            }

            // Then between consecutive plans of the same extruder.
            let operations = layer.operations_mut();
            let mut index_first = 0;
            while index_first + 1 < operations.len() {
                let (before, after) = (&operations[index_first], &operations[index_first + 1]);
                let (LayerOperation::ExtruderPlan(plan_before), LayerOperation::ExtruderPlan(plan_after)) =
                    (before, after)
                else {
                    index_first += 1;
                    continue;
                };

                if plan_before.extruder_nr() != plan_after.extruder_nr() {
                    index_first += 1;
                    continue;
                }

                let speed = travel_speed(
                    settings,
                    layer_index,
                    speedup_layer_count,
                    plan_before.extruder_nr(),
                );
                if let (Some(end), Some(start)) =
                    (plan_before.find_end_position(), plan_after.find_start_position())
                {
                    if let Some(route) = make_travel_route(end, start, speed) {
                        operations.insert(index_first + 1, LayerOperation::Travel(route));
                        index_first += 1;
                    }
                }
                index_first += 1;
            }
        }
    }

    fn append_travels_in_extruder_plan(extruder_plan: &mut ExtruderPlan, speed: SpeedDerivatives) {
        for feature in extruder_plan.features_mut() {
            append_travels_between_children(
                feature.operations_mut(),
                speed,
                FeatureOperation::find_end_position,
                FeatureOperation::find_start_position,
                FeatureOperation::Travel,
            );
        }

        append_travels_between_children(
            extruder_plan.operations_mut(),
            speed,
            ExtruderOperation::find_end_position,
            ExtruderOperation::find_start_position,
            ExtruderOperation::Travel,
        );
    }
}

///Insert a travel between every pair of consecutive children whose end
///and next start differ. Each level of the tree wraps the route in its
///own child type.
fn append_travels_between_children<Child>(
    operations: &mut Vec<Child>,
    speed: SpeedDerivatives,
    end_position: impl Fn(&Child) -> Option<Point3>,
    start_position: impl Fn(&Child) -> Option<Point3>,
    into_child: impl Fn(TravelRoute) -> Child,
) {
    let mut index_first = 0;
    while index_first + 1 < operations.len() {
        let end = end_position(&operations[index_first]);
        let start = start_position(&operations[index_first + 1]);
        if let (Some(end), Some(start)) = (end, start) {
            if let Some(route) = make_travel_route(end, start, speed) {
                operations.insert(index_first + 1, into_child(route));
                index_first += 1;
            }
        }
        index_first += 1;
    }
}

///The travel speed of a layer: the layer-0 values on the first layer, the
///full values after the speedup layers, a linear blend in between.
fn travel_speed(
    settings: &Settings,
    layer_index: usize,
    speedup_layer_count: usize,
    extruder_nr: u8,
) -> SpeedDerivatives {
    let extruder = settings.extruder(extruder_nr);
    let initial = extruder.travel_speed_initial();
    let full = extruder.travel_speed_full();

    if layer_index == 0 {
        initial
    } else if layer_index >= speedup_layer_count {
        full
    } else {
        full.smoothed(initial, layer_index, speedup_layer_count)
    }
}
