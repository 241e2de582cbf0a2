pub mod nms_entity;
