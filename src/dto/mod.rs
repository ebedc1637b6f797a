pub mod prequal_dto;
