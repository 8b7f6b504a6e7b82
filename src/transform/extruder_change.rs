use crate::plan::{ExtruderChange, LayerOperation, PrintPlan};

///Inserts an extruder-change operation between every pair of consecutive
///extruder plans that use different extruders. The change lands in the
///layer plan of the earlier of the two.
pub struct ExtruderChangeAppender;

impl ExtruderChangeAppender {
    pub fn process(print_plan: &mut PrintPlan) {
        // Locate every extruder plan across the whole print, in order.
        let mut plan_positions: Vec<(usize, usize, u8)> = Vec::new();
        for (layer_position, layer) in print_plan.layers().iter().enumerate() {
            for (operation_index, operation) in layer.operations().iter().enumerate() {
                if let LayerOperation::ExtruderPlan(extruder_plan) = operation {
                    plan_positions.push((
                        layer_position,
                        operation_index,
                        extruder_plan.extruder_nr(),
                    ));
                }
            }
        }

        // Insert back-to-front so earlier indices stay valid.
        for window_position in (0..plan_positions.len().saturating_sub(1)).rev() {
            let (layer_position, operation_index, extruder_before) =
                plan_positions[window_position];
            let (_, _, extruder_after) = plan_positions[window_position + 1];

            if extruder_before != extruder_after {
                let layer = &mut print_plan.layers_mut()[layer_position];
                layer.operations_mut().insert(
                    operation_index + 1,
                    LayerOperation::ExtruderChange(ExtruderChange::new(
                        extruder_before,
                        extruder_after,
                    )),
                );
            }
        }
    }
}
